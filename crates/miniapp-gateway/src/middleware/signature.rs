//! VK signature gate.
//!
//! Enforces launch-parameter verification on protected routes before any
//! handler logic runs. For a protected path the gate extracts launch
//! parameters from the request, verifies their signature, and either rejects
//! (400 for missing parameters, 403 for a bad signature) or attaches the
//! verified identity as a [`VerifiedLaunch`] extension and dispatches.
//!
//! Public and unmatched routes pass through untouched. The route policy is
//! injected at construction, not read from statics, so tests and deployments
//! can vary it freely.

use crate::domain::config::RoutePolicy;
use crate::domain::error::ApiError;
use crate::domain::types::LaunchParams;
use crate::vk::sign::{extract_identity, verify_launch_params, SIGN_KEY, VK_PREFIX};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{info, warn};

/// Request body cap while buffering for parameter extraction.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Signature gate configuration
#[derive(Clone)]
pub struct SignatureGateConfig {
    /// Shared secret issued by VK for the Mini App
    pub secret: String,
    /// Which paths are gated
    pub policy: RoutePolicy,
}

/// Signature gate layer
#[derive(Clone)]
pub struct SignatureLayer {
    config: Arc<SignatureGateConfig>,
}

impl SignatureLayer {
    pub fn new(config: SignatureGateConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for SignatureLayer {
    type Service = SignatureService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignatureService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Signature gate service
#[derive(Clone)]
pub struct SignatureService<S> {
    inner: S,
    config: Arc<SignatureGateConfig>,
}

impl<S> Service<Request<Body>> for SignatureService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if !config.policy.requires_check(&path) {
                return inner.call(req).await;
            }

            let client_ip = super::client_ip_from_headers(req.headers());

            // Buffer the body: launch params may live in a JSON field, and the
            // handler still needs the bytes afterwards.
            let (mut parts, body) = req.into_parts();
            let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to read request body at signature gate");
                    return Ok(
                        ApiError::bad_request("Missing VK launch parameters").into_response()
                    );
                }
            };

            let launch_params = extract_launch_params(&body_bytes, parts.uri.query());

            let Some(launch_params) = launch_params else {
                warn!(path = %path, client_ip = %client_ip, "Missing VK launch parameters");
                return Ok(ApiError::bad_request("Missing VK launch parameters").into_response());
            };

            if !verify_launch_params(&launch_params, &config.secret) {
                warn!(path = %path, client_ip = %client_ip, "VK signature validation failed");
                return Ok(ApiError::forbidden("Invalid VK signature").into_response());
            }

            let identity = extract_identity(&launch_params);
            info!(vk_user_id = %identity.user_id, path = %path, "VK signature verified");
            parts.extensions.insert(identity);

            let req = Request::from_parts(parts, Body::from(body_bytes));
            inner.call(req).await
        })
    }
}

/// Locate launch parameters in a request: a `launch_params` object in the
/// JSON body first, otherwise `vk_*` keys plus `sign` in the query string.
fn extract_launch_params(body: &[u8], query: Option<&str>) -> Option<LaunchParams> {
    if let Some(params) = params_from_body(body) {
        return Some(params);
    }
    params_from_query(query?)
}

fn params_from_body(body: &[u8]) -> Option<LaunchParams> {
    if body.is_empty() {
        return None;
    }

    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.get("launch_params")?.as_object()?;

    let mut params = LaunchParams::new();
    for (key, value) in object {
        // Clients occasionally send numeric ids unquoted.
        match value {
            serde_json::Value::String(s) => {
                params.insert(key.clone(), s.clone());
            }
            serde_json::Value::Number(n) => {
                params.insert(key.clone(), n.to_string());
            }
            _ => {}
        }
    }

    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

fn params_from_query(query: &str) -> Option<LaunchParams> {
    let mut params = LaunchParams::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key.starts_with(VK_PREFIX) || key == SIGN_KEY {
            params.insert(key.into_owned(), value.into_owned());
        }
    }

    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_json_body() {
        let body = br#"{"launch_params": {"vk_user_id": "42", "vk_app_id": 100, "sign": "abc"}, "group_id": "7"}"#;
        let params = params_from_body(body).unwrap();
        assert_eq!(params.get("vk_user_id").unwrap(), "42");
        assert_eq!(params.get("vk_app_id").unwrap(), "100");
        assert_eq!(params.get("sign").unwrap(), "abc");
        assert!(!params.contains_key("group_id"));
    }

    #[test]
    fn test_body_without_launch_params() {
        assert!(params_from_body(br#"{"group_id": "7"}"#).is_none());
        assert!(params_from_body(b"").is_none());
        assert!(params_from_body(b"not json").is_none());
    }

    #[test]
    fn test_params_from_query() {
        let params =
            params_from_query("vk_user_id=42&vk_platform=mobile_android&sign=abc&page=2").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("vk_user_id").unwrap(), "42");
        assert!(!params.contains_key("page"));
    }

    #[test]
    fn test_query_without_vk_params() {
        assert!(params_from_query("page=2&sort=rate").is_none());
    }

    #[test]
    fn test_body_wins_over_query() {
        let body = br#"{"launch_params": {"vk_user_id": "42", "sign": "abc"}}"#;
        let params = extract_launch_params(body, Some("vk_user_id=99&sign=zzz")).unwrap();
        assert_eq!(params.get("vk_user_id").unwrap(), "42");
    }

    #[test]
    fn test_percent_decoding_in_query() {
        let params = params_from_query("vk_ts=1650000000&sign=a%2Bb%2Fc").unwrap();
        assert_eq!(params.get("sign").unwrap(), "a+b/c");
    }
}
