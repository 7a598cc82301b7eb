//! VK platform API client.
//!
//! The gateway only calls `messages.isMessagesFromGroupAllowed`, as a
//! best-effort confirmation when a user reports having allowed community
//! messages. API failures are surfaced to the caller, which logs them and
//! proceeds with the local state update.

use crate::domain::config::VkConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Errors from the VK platform API.
#[derive(Debug, Error)]
pub enum VkApiError {
    #[error("group access token not configured")]
    Unconfigured,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },
}

/// Outbound port for the messaging-permission check, so handlers and tests
/// can stub the platform.
#[async_trait]
pub trait MessagesPermissionCheck: Send + Sync {
    /// Whether `user_id` allowed messages from community `group_id`.
    async fn is_messages_allowed(&self, group_id: &str, user_id: &str)
        -> Result<bool, VkApiError>;
}

/// VK API client backed by reqwest.
pub struct VkClient {
    client: Client,
    base_url: String,
    version: String,
    token: Option<String>,
}

impl VkClient {
    /// Create a client from the gateway VK configuration.
    pub fn new(config: &VkConfig) -> Result<Self, VkApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(VkApiError::Http)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            version: config.api_version.clone(),
            token: config.group_access_token.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct VkEnvelope {
    error: Option<VkError>,
    response: Option<IsAllowedResponse>,
}

#[derive(Debug, Deserialize)]
struct VkError {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct IsAllowedResponse {
    #[serde(default)]
    is_allowed: u8,
}

#[async_trait]
impl MessagesPermissionCheck for VkClient {
    async fn is_messages_allowed(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, VkApiError> {
        let token = self.token.as_deref().ok_or(VkApiError::Unconfigured)?;

        let url = format!("{}/messages.isMessagesFromGroupAllowed", self.base_url);
        let envelope: VkEnvelope = self
            .client
            .get(&url)
            .query(&[
                ("group_id", group_id),
                ("user_id", user_id),
                ("access_token", token),
                ("v", &self.version),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = envelope.error {
            return Err(VkApiError::Api {
                code: err.error_code,
                message: err.error_msg,
            });
        }

        Ok(envelope.response.map(|r| r.is_allowed == 1).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_token() {
        let config = VkConfig::default();
        let client = VkClient::new(&config).unwrap();
        assert!(client.token.is_none());
    }

    #[test]
    fn test_envelope_parsing_allowed() {
        let envelope: VkEnvelope =
            serde_json::from_str(r#"{"response": {"is_allowed": 1}}"#).unwrap();
        assert!(envelope.error.is_none());
        assert_eq!(envelope.response.unwrap().is_allowed, 1);
    }

    #[test]
    fn test_envelope_parsing_error() {
        let envelope: VkEnvelope = serde_json::from_str(
            r#"{"error": {"error_code": 15, "error_msg": "Access denied"}}"#,
        )
        .unwrap();
        let err = envelope.error.unwrap();
        assert_eq!(err.error_code, 15);
        assert_eq!(err.error_msg, "Access denied");
    }
}
