//! Offer catalog listing and click-through redirects.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::{ClickRecord, OfferQuery, OfferSort};
use crate::middleware::client_ip::client_ip_from_headers;
use crate::service::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct OffersQuery {
    pub sum_need: Option<u64>,
    pub term_days: Option<u32>,
    pub sort: Option<OfferSort>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl OffersQuery {
    fn into_catalog_query(self) -> OfferQuery {
        OfferQuery {
            sum_need: self.sum_need,
            term_days: self.term_days,
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            page_size: self
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// GET /api/offers/
pub async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<OffersQuery>,
) -> Json<serde_json::Value> {
    let page = state.offers.list(&query.into_catalog_query()).await;

    Json(json!({
        "success": true,
        "data": page,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub vk_user_id: Option<String>,
    pub vk_group_id: Option<String>,
    pub brand: Option<String>,
}

/// GET /go/:offer_id
///
/// Records the click best-effort and redirects to the partner URL with the
/// `{sub_id}` placeholder substituted. A failed click write is logged and
/// never blocks the redirect.
pub async fn redirect_to_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
    Query(query): Query<RedirectQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let offer = state
        .offers
        .get(&offer_id)
        .await
        .ok_or_else(|| ApiError::not_found("Offer not found"))?;

    let sub_id = match &query.vk_user_id {
        Some(user) => {
            let group = query.vk_group_id.as_deref().unwrap_or("0");
            format!("vk_{user}_{group}_{offer_id}")
        }
        None => offer_id.clone(),
    };

    let click = ClickRecord {
        offer_id: offer_id.clone(),
        vk_user_id: query.vk_user_id.clone(),
        group_id: query.vk_group_id.clone(),
        brand: query.brand.clone(),
        ip_address: Some(client_ip_from_headers(&headers)),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        created_at: Utc::now(),
    };

    if let Err(err) = state.clicks.record(click).await {
        warn!(offer_id = %offer_id, error = %err, "Failed to record offer click");
    }

    let target = offer.redirect_url.replace("{sub_id}", &sub_id);
    info!(offer_id = %offer_id, sub_id = %sub_id, "Redirecting to partner offer");

    Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
}
