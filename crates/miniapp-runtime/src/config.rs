//! Environment-driven configuration loading.
//!
//! Every deployment knob maps to one environment variable. Unset variables
//! fall back to the library defaults; `VK_APP_SECRET` has no default and the
//! server refuses to start without it.

use anyhow::{Context, Result};
use miniapp_gateway::GatewayConfig;
use std::env;
use std::net::SocketAddr;

/// Build the gateway configuration from the process environment.
///
/// Recognized variables:
/// - `VK_APP_SECRET` (required): Mini App signing secret
/// - `VK_GROUP_ACCESS_TOKEN`: community token for the messages permission check
/// - `VK_CALLBACK_SECRET`: shared secret expected in Callback API events
/// - `VK_CONFIRMATION_CODE`: string returned to the `confirmation` event
/// - `DEFAULT_BRAND`: brand served when no override or group mapping applies
/// - `BIND_ADDR`: socket address to listen on, e.g. `0.0.0.0:8000`
/// - `TRUST_PRIVATE_IPS`: set to `1` or `true` to trust private-range proxies
pub fn from_env() -> Result<GatewayConfig> {
    let mut config = GatewayConfig::default();

    config.security.vk_app_secret =
        env::var("VK_APP_SECRET").context("VK_APP_SECRET must be set")?;

    if let Some(token) = non_empty("VK_GROUP_ACCESS_TOKEN") {
        config.vk.group_access_token = Some(token);
    }
    if let Some(secret) = non_empty("VK_CALLBACK_SECRET") {
        config.vk.callback_secret = Some(secret);
    }
    if let Some(code) = non_empty("VK_CONFIRMATION_CODE") {
        config.vk.confirmation_code = code;
    }
    if let Some(brand) = non_empty("DEFAULT_BRAND") {
        config.brands.default_brand = brand;
    }

    if let Some(addr) = non_empty("BIND_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid BIND_ADDR: {addr}"))?;
        config.http.host = addr.ip();
        config.http.port = addr.port();
    }

    if let Some(flag) = non_empty("TRUST_PRIVATE_IPS") {
        config.security.trust_private_ips = matches!(flag.as_str(), "1" | "true" | "yes");
    }

    Ok(config)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
