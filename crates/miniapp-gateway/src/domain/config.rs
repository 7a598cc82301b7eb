//! Gateway configuration with validation.
//!
//! Everything deployment-specific lives here: bind address, CORS, trusted
//! proxies, the VK app secret and Callback API credentials, the default brand,
//! and the route policy consumed by the signature gate. The runtime binary
//! fills these from environment variables; tests construct them directly.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Security configuration (app secret, trusted proxies)
    pub security: SecurityConfig,
    /// Route policy for the signature gate
    pub routes: RoutePolicy,
    /// VK platform API configuration
    pub vk: VkConfig,
    /// Brand selection configuration
    pub brands: BrandsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            cors: CorsConfig::default(),
            security: SecurityConfig::default(),
            routes: RoutePolicy::default(),
            vk: VkConfig::default(),
            brands: BrandsConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration.
    ///
    /// An empty app secret makes every signature check fail closed, which looks
    /// like an attack in the logs when it is really a deployment defect. Refuse
    /// to start instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.vk_app_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http port cannot be 0".into()));
        }

        if self.brands.default_brand.is_empty() {
            return Err(ConfigError::Invalid(
                "default_brand cannot be empty".into(),
            ));
        }

        if self.routes.protected.is_empty() {
            return Err(ConfigError::Invalid(
                "route policy must protect at least one prefix".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all; Mini Apps are served from vk.com frames)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds)
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            max_age: 86400,
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret issued by VK for the Mini App; never transmitted or logged
    pub vk_app_secret: String,
    /// List of trusted proxy IPs whose X-Forwarded-For is honoured
    pub trusted_proxies: Vec<IpAddr>,
    /// Trust private IPs (10.x, 172.16.x, 192.168.x) as proxies
    pub trust_private_ips: bool,
    /// Number of proxies in chain (for X-Forwarded-For parsing)
    pub proxy_count: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            vk_app_secret: String::new(),
            trusted_proxies: Vec::new(),
            trust_private_ips: false,
            proxy_count: 1,
        }
    }
}

/// Route policy for the signature gate.
///
/// An explicit object rather than module-level path constants so tests and
/// multi-tenant deployments can vary the policy without shared state. A public
/// prefix match short-circuits the check even if the path would also match a
/// protected prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutePolicy {
    /// Path prefixes requiring a valid VK signature
    pub protected: Vec<String>,
    /// Path prefixes that bypass verification; wins over `protected`
    pub public: Vec<String>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            protected: vec![
                "/api/subscribe/".to_string(),
                "/api/subscribe/allow-messages/".to_string(),
                "/api/unsubscribe/".to_string(),
                "/api/subscription/status/".to_string(),
            ],
            public: vec![
                "/api/config/".to_string(),
                "/api/offers/".to_string(),
                "/api/health/".to_string(),
                "/api/vk-callback/".to_string(),
                "/api/vk-ads/".to_string(),
                "/go/".to_string(),
            ],
        }
    }
}

impl RoutePolicy {
    /// Whether a request path requires signature verification.
    pub fn requires_check(&self, path: &str) -> bool {
        if self.public.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }
        self.protected.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// VK platform API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VkConfig {
    /// Community access token for messages.isMessagesFromGroupAllowed
    pub group_access_token: Option<String>,
    /// Shared secret expected in Callback API events
    pub callback_secret: Option<String>,
    /// Confirmation string returned to VK's `confirmation` event
    pub confirmation_code: String,
    /// VK API base URL
    pub api_base_url: String,
    /// VK API version
    pub api_version: String,
    /// Timeout for VK API requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for VkConfig {
    fn default() -> Self {
        Self {
            group_access_token: None,
            callback_secret: None,
            confirmation_code: String::new(),
            api_base_url: "https://api.vk.com/method".to_string(),
            api_version: "5.131".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Brand selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandsConfig {
    /// Brand served when neither the `brand` override nor the group mapping apply
    pub default_brand: String,
}

impl Default for BrandsConfig {
    fn default() -> Self {
        Self {
            default_brand: "kokos".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// VK app secret is not configured
    #[error("vk_app_secret is not configured")]
    MissingSecret,
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
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
    fn test_default_config_rejects_empty_secret() {
        let config = GatewayConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_configured_is_valid() {
        assert!(configured().validate().is_ok());
        assert_eq!(configured().http_addr().port(), 8000);
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = configured();
        config.http.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_route_policy_protected() {
        let policy = RoutePolicy::default();
        assert!(policy.requires_check("/api/subscribe/"));
        assert!(policy.requires_check("/api/subscription/status/"));
        assert!(policy.requires_check("/api/unsubscribe/"));
    }

    #[test]
    fn test_route_policy_public_and_unmatched() {
        let policy = RoutePolicy::default();
        assert!(!policy.requires_check("/api/offers/"));
        assert!(!policy.requires_check("/api/health/"));
        assert!(!policy.requires_check("/api/vk-ads/log-event/"));
        assert!(!policy.requires_check("/go/offer_1"));
        assert!(!policy.requires_check("/something/else"));
    }

    #[test]
    fn test_public_wins_over_protected() {
        let policy = RoutePolicy {
            protected: vec!["/api/".to_string()],
            public: vec!["/api/health/".to_string()],
        };
        assert!(policy.requires_check("/api/subscribe/"));
        assert!(!policy.requires_check("/api/health/"));
    }
}
