//! Gateway assembly: application state, router construction and the server
//! lifecycle.
//!
//! Handlers see only [`AppState`], which holds the configuration and the
//! outbound ports as trait objects. The router is a free function over the
//! state so integration tests can drive it with `tower::ServiceExt::oneshot`
//! without binding a socket.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::handlers;
use crate::middleware::{
    create_cors_layer, ClientIpLayer, SignatureGateConfig, SignatureLayer, TracingLayer,
};
use crate::store::{
    AdsEventLog, BrandStore, ClickLogger, InMemoryAdsEvents, InMemoryBrands, InMemoryClicks,
    InMemoryOffers, InMemorySubscribers, OfferCatalog, SubscriberStore,
};
use crate::vk::api::{MessagesPermissionCheck, VkClient};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{error, info};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub offers: Arc<dyn OfferCatalog>,
    pub clicks: Arc<dyn ClickLogger>,
    pub brands: Arc<dyn BrandStore>,
    pub ads_events: Arc<dyn AdsEventLog>,
    pub vk: Arc<dyn MessagesPermissionCheck>,
}

impl AppState {
    /// State over the in-memory adapters with demo catalog and brand data.
    pub fn in_memory(config: GatewayConfig) -> Result<Self, GatewayError> {
        let vk =
            VkClient::new(&config.vk).map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            subscribers: Arc::new(InMemorySubscribers::new()),
            offers: Arc::new(InMemoryOffers::demo()),
            clicks: Arc::new(InMemoryClicks::new()),
            brands: Arc::new(InMemoryBrands::demo()),
            ads_events: Arc::new(InMemoryAdsEvents::new()),
            vk: Arc::new(vk),
        })
    }
}

/// Build the gateway router over the given state.
///
/// Layer order, outermost first: CORS, tracing, client IP resolution, then
/// the signature gate immediately before the handlers.
pub fn router(state: AppState) -> Router {
    let config = &state.config;

    let gate = SignatureLayer::new(SignatureGateConfig {
        secret: config.security.vk_app_secret.clone(),
        policy: config.routes.clone(),
    });

    let mut app = Router::new()
        .route("/api/health/", get(handlers::health::health_check))
        .route("/api/config/", get(handlers::config::get_config))
        .route("/api/offers/", get(handlers::offers::list_offers))
        .route("/go/:offer_id", get(handlers::offers::redirect_to_offer))
        .route("/api/subscribe/", post(handlers::subscription::subscribe))
        .route(
            "/api/subscribe/allow-messages/",
            post(handlers::subscription::allow_messages),
        )
        .route(
            "/api/unsubscribe/",
            post(handlers::subscription::unsubscribe),
        )
        .route(
            "/api/subscription/status/",
            get(handlers::subscription::subscription_status),
        )
        .route("/api/vk-callback/", post(handlers::callback::vk_callback))
        .route("/api/vk-ads/log-event/", post(handlers::ads::log_event))
        .layer(
            ServiceBuilder::new()
                .layer(TracingLayer::new())
                .layer(ClientIpLayer::new(config.security.clone()))
                .layer(gate),
        )
        .with_state(state.clone());

    if state.config.cors.enabled {
        app = app.layer(create_cors_layer(&state.config.cors));
    }

    app
}

/// The gateway server.
pub struct GatewayService {
    state: AppState,
}

impl GatewayService {
    /// Validate the configuration and assemble the service over the
    /// in-memory adapters.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            state: AppState::in_memory(config)?,
        })
    }

    /// Assemble the service over externally supplied state. The caller is
    /// responsible for having validated the configuration.
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind and serve until a shutdown signal arrives.
    pub async fn start(self) -> Result<(), GatewayError> {
        let addr = self.state.config.http_addr();
        let app = router(self.state);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        info!(%addr, version = crate::VERSION, "Gateway listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.security.vk_app_secret = "topsecret".to_string();
        config
    }

    #[test]
    fn test_new_rejects_missing_secret() {
        let result = GatewayService::new(GatewayConfig::default());
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_new_accepts_configured() {
        assert!(GatewayService::new(configured()).is_ok());
    }

    #[tokio::test]
    async fn test_router_builds() {
        let state = AppState::in_memory(configured()).unwrap();
        let _app = router(state);
    }
}
