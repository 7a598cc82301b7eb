//! Middleware stack for the gateway.
//!
//! Layer order: Request → CORS → Tracing → ClientIp → SignatureGate → Handler
//!
//! The signature gate is the single enforcement point for VK launch-parameter
//! verification; handlers never re-check signatures themselves.

pub mod client_ip;
pub mod cors;
pub mod signature;
pub mod tracing;

pub use client_ip::{client_ip_from_headers, ClientIpLayer};
pub use cors::create_cors_layer;
pub use signature::{SignatureGateConfig, SignatureLayer};
pub use tracing::TracingLayer;
