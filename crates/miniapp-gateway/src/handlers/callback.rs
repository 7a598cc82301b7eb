//! VK Callback API endpoint.
//!
//! VK delivers community events (confirmation handshake, message_allow,
//! message_deny) as JSON POSTs. The endpoint is public; authenticity comes
//! from the shared callback secret embedded in each event. VK retries until
//! it receives the literal body `ok`, so unhandled event types still return
//! it.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::error::{ApiError, ApiResult};
use crate::service::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub group_id: Option<u64>,
    pub secret: Option<String>,
    #[serde(default)]
    pub object: Value,
}

/// POST /api/vk-callback/
pub async fn vk_callback(
    State(state): State<AppState>,
    Json(event): Json<CallbackEvent>,
) -> ApiResult<String> {
    if let Some(expected) = state.config.vk.callback_secret.as_deref() {
        if event.secret.as_deref() != Some(expected) {
            warn!(
                event_type = %event.event_type,
                group_id = ?event.group_id,
                "VK callback with wrong secret rejected"
            );
            return Err(ApiError::forbidden("Invalid callback secret"));
        }
    }

    match event.event_type.as_str() {
        "confirmation" => {
            let code = state.config.vk.confirmation_code.clone();
            if code.is_empty() {
                warn!("VK confirmation requested but no confirmation code configured");
                return Err(ApiError::internal("Confirmation code not configured"));
            }
            info!(group_id = ?event.group_id, "VK callback confirmation served");
            Ok(code)
        }
        "message_allow" => {
            if let Some(user_id) = event_user_id(&event.object) {
                // The callback can arrive before the user ever opens the app.
                state
                    .subscribers
                    .set_messages_allowed(&user_id, true, true)
                    .await;
                info!(vk_user_id = %user_id, "User allowed community messages");
            } else {
                warn!("message_allow event without a user id");
            }
            Ok("ok".to_string())
        }
        "message_deny" => {
            if let Some(user_id) = event_user_id(&event.object) {
                state
                    .subscribers
                    .set_messages_allowed(&user_id, false, false)
                    .await;
                info!(vk_user_id = %user_id, "User denied community messages");
            } else {
                warn!("message_deny event without a user id");
            }
            Ok("ok".to_string())
        }
        other => {
            info!(event_type = %other, "Ignoring unhandled VK callback event");
            Ok("ok".to_string())
        }
    }
}

/// VK sends the user id as a JSON number in `object.user_id`.
fn event_user_id(object: &Value) -> Option<String> {
    match object.get("user_id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_deserializes() {
        let event: CallbackEvent = serde_json::from_value(json!({
            "type": "message_allow",
            "group_id": 123456789,
            "secret": "cb-secret",
            "object": {"user_id": 42, "key": "k"},
        }))
        .unwrap();
        assert_eq!(event.event_type, "message_allow");
        assert_eq!(event.secret.as_deref(), Some("cb-secret"));
        assert_eq!(event_user_id(&event.object).as_deref(), Some("42"));
    }

    #[test]
    fn test_event_user_id_variants() {
        assert_eq!(
            event_user_id(&json!({"user_id": "77"})).as_deref(),
            Some("77")
        );
        assert_eq!(event_user_id(&json!({"user_id": ""})), None);
        assert_eq!(event_user_id(&json!({})), None);
    }
}
