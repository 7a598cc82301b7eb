//! CORS layer built from gateway configuration.
//!
//! Thin wrapper around tower-http; the Mini App frontend is served from a VK
//! frame, so the default policy is permissive on origins.

use crate::domain::config::CorsConfig;
use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Create a CORS layer from gateway config
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        // No headers added; the router normally skips the layer entirely.
        return CorsLayer::new();
    }

    let mut cors = CorsLayer::new();

    if config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    if config.allowed_headers.contains(&"*".to_string()) {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<HeaderName> = config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors.max_age(Duration::from_secs(config.max_age))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke test: the layer is opaque, so only construction is checked.
    #[test]
    fn test_default_cors_config() {
        let config = CorsConfig::default();
        let layer = create_cors_layer(&config);
        assert!(config.enabled);
        drop(layer);
    }

    #[test]
    fn test_specific_origins() {
        let config = CorsConfig {
            allowed_origins: vec!["https://minapp.example.com".to_string()],
            ..Default::default()
        };
        let layer = create_cors_layer(&config);
        assert_eq!(config.allowed_origins.len(), 1);
        drop(layer);
    }
}
