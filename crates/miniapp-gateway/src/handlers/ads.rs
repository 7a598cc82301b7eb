//! VK Ads event intake.
//!
//! The frontend fires conversion events (lead, subscribe, product_card...)
//! into the VK Ads SDK and mirrors every attempt here, failed sends included,
//! so delivery problems show up in the server logs.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::AdsEvent;
use crate::middleware::client_ip::client_ip_from_headers;
use crate::service::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LogEventBody {
    pub event_name: Option<String>,
    pub vk_user_id: Option<String>,
    pub event_params: Option<Value>,
    pub success: Option<bool>,
    pub error_message: Option<String>,
    pub platform: Option<String>,
}

/// POST /api/vk-ads/log-event/
///
/// A store failure yields `logged: false`, not an error; losing an analytics
/// event must never disturb the client.
pub async fn log_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<LogEventBody>>,
) -> ApiResult<Json<Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let event_name = body
        .event_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("event_name is required"))?;

    let success = body.success.unwrap_or(true);
    if success {
        info!(
            event_name = %event_name,
            vk_user_id = ?body.vk_user_id,
            platform = ?body.platform,
            "VK Ads event"
        );
    } else {
        error!(
            event_name = %event_name,
            vk_user_id = ?body.vk_user_id,
            error_message = ?body.error_message,
            "VK Ads event send failed on client"
        );
    }

    let event = AdsEvent {
        event_name,
        vk_user_id: body.vk_user_id,
        event_params: body.event_params,
        success,
        error_message: body.error_message,
        ip_address: Some(client_ip_from_headers(&headers)),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        platform: body.platform,
        created_at: Utc::now(),
    };

    match state.ads_events.record(event).await {
        Ok(event_id) => Ok(Json(json!({
            "success": true,
            "data": {"event_id": event_id, "logged": true},
        }))),
        Err(err) => {
            warn!(error = %err, "Failed to store VK Ads event");
            Ok(Json(json!({
                "success": true,
                "data": {"event_id": null, "logged": false},
            })))
        }
    }
}
