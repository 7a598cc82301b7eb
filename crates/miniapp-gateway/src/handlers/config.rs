//! Brand configuration endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::service::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    /// Explicit brand override, takes priority over the group mapping.
    pub brand: Option<String>,
    /// Community the Mini App was launched from.
    pub vk_group_id: Option<String>,
}

/// GET /api/config/
///
/// Resolves the active brand for this launch and returns its theming
/// payload. Never fails: an unknown brand falls back to the default.
pub async fn get_config(
    State(state): State<AppState>,
    Query(query): Query<ConfigQuery>,
) -> Json<serde_json::Value> {
    let brand = state
        .brands
        .get_active(
            query.brand.as_deref(),
            query.vk_group_id.as_deref(),
            &state.config.brands.default_brand,
        )
        .await;

    Json(json!({
        "success": true,
        "data": brand,
    }))
}
