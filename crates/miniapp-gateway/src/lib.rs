#![warn(clippy::all)]
#![deny(unsafe_code)]

//! HTTP gateway for a white-label VK Mini App loan-offer aggregator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MINIAPP GATEWAY                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────┐            │
//! │  │            Middleware Stack                   │            │
//! │  │  CORS → Tracing → ClientIp → SignatureGate   │            │
//! │  └──────────────────┬───────────────────────────┘            │
//! │                     │                                         │
//! │  ┌──────────────────┴───────────────────────────┐            │
//! │  │                 Handlers                      │            │
//! │  │  config / offers / go / subscription /        │            │
//! │  │  vk-callback / vk-ads / health                │            │
//! │  └──────────────────┬───────────────────────────┘            │
//! │                     │                                         │
//! │  ┌──────────────────┴───────────────────────────┐            │
//! │  │            Outbound Ports                     │            │
//! │  │  SubscriberStore / OfferCatalog /             │            │
//! │  │  ClickLogger / BrandStore / AdsEventLog /     │            │
//! │  │  VK API                                       │            │
//! │  └──────────────────────────────────────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Route classes
//!
//! - **Protected**: subscription endpoints; require a valid VK launch-parameter
//!   signature. The gate attaches the verified identity as a request extension.
//! - **Public**: config, offers, click-through redirect, health, VK callback,
//!   VK Ads event intake.
//!
//! # Security
//!
//! - HMAC-SHA256 over the canonicalized `vk_*` launch parameters, compared in
//!   constant time against the base64url `sign` value attached by the platform
//! - The app secret is never logged; signature values appear only at debug level
//! - Client IP resolution honours only configured trusted proxies

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod service;
pub mod store;
pub mod vk;

// Re-exports for public API
pub use domain::config::{GatewayConfig, RoutePolicy};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use domain::types::*;
pub use service::{AppState, GatewayService};
pub use vk::sign::verify_launch_params;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identifier reported by the health endpoint.
pub const SERVICE_NAME: &str = "miniapp-gateway";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_service_name() {
        assert_eq!(SERVICE_NAME, "miniapp-gateway");
    }
}
