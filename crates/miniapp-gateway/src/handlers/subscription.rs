//! Subscription lifecycle handlers.
//!
//! All of these sit behind the signature gate. The acting user id always
//! comes from the verified identity extension, never from the request body,
//! so a valid signature for user A can never mutate user B.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::VerifiedLaunch;
use crate::service::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeBody {
    pub group_id: Option<String>,
    pub brand: Option<String>,
}

/// Community id for this request: explicit body value first, then the
/// signed `vk_group_id` launch parameter.
fn effective_group_id(body: &SubscribeBody, launch: &VerifiedLaunch) -> Option<String> {
    body.group_id
        .clone()
        .or_else(|| launch.params.get("vk_group_id").cloned())
        .filter(|g| !g.is_empty())
}

/// POST /api/subscribe/
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(launch): Extension<VerifiedLaunch>,
    body: Option<Json<SubscribeBody>>,
) -> Json<serde_json::Value> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let group_id = effective_group_id(&body, &launch);

    let (subscriber, created) = state
        .subscribers
        .subscribe(&launch.user_id, group_id.as_deref(), body.brand.as_deref())
        .await;

    info!(
        vk_user_id = %launch.user_id,
        created = created,
        "Subscription recorded"
    );

    Json(json!({
        "success": true,
        "created": created,
        "data": subscriber,
    }))
}

/// POST /api/unsubscribe/
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(launch): Extension<VerifiedLaunch>,
) -> ApiResult<Json<serde_json::Value>> {
    let subscriber = state
        .subscribers
        .unsubscribe(&launch.user_id)
        .await
        .ok_or_else(|| ApiError::not_found("Subscriber not found"))?;

    info!(vk_user_id = %launch.user_id, "Subscription cancelled");

    Ok(Json(json!({
        "success": true,
        "data": subscriber,
    })))
}

/// POST /api/subscribe/allow-messages/
///
/// Marks the user as having allowed community messages. When a group access
/// token is configured the flag is cross-checked against the VK API; that
/// check is best-effort and its outcome is reported but never blocks the
/// update.
pub async fn allow_messages(
    State(state): State<AppState>,
    Extension(launch): Extension<VerifiedLaunch>,
    body: Option<Json<SubscribeBody>>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let group_id = effective_group_id(&body, &launch)
        .ok_or_else(|| ApiError::bad_request("group_id is required"))?;

    let subscriber = state
        .subscribers
        .set_messages_allowed(&launch.user_id, true, false)
        .await
        .ok_or_else(|| ApiError::not_found("Subscriber not found"))?;

    let vk_api_confirmed = match state
        .vk
        .is_messages_allowed(&group_id, &launch.user_id)
        .await
    {
        Ok(allowed) => Some(allowed),
        Err(err) => {
            warn!(
                vk_user_id = %launch.user_id,
                group_id = %group_id,
                error = %err,
                "Could not confirm messages permission with VK"
            );
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "vk_api_confirmed": vk_api_confirmed,
        "data": subscriber,
    })))
}

/// GET /api/subscription/status/
///
/// Always 200. Unknown users get the not-subscribed shape rather than an
/// error, since the frontend polls this on every launch.
pub async fn subscription_status(
    State(state): State<AppState>,
    Extension(launch): Extension<VerifiedLaunch>,
) -> Json<serde_json::Value> {
    match state.subscribers.get(&launch.user_id).await {
        Some(sub) => Json(json!({
            "success": true,
            "data": {
                "vk_user_id": sub.vk_user_id,
                "subscribed": sub.subscribed,
                "allowed_from_group": sub.allowed_from_group,
                "can_receive_messages": sub.can_receive_messages(),
            },
        })),
        None => Json(json!({
            "success": true,
            "data": {
                "vk_user_id": launch.user_id,
                "subscribed": false,
                "allowed_from_group": false,
                "can_receive_messages": false,
            },
        })),
    }
}
