//! Core entities: subscribers, offers, clicks, brand configuration, and the
//! verified launch identity attached to gated requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Launch parameters as received from the platform: key → value, order
/// irrelevant, includes the `sign` entry.
pub type LaunchParams = HashMap<String, String>;

/// Identity extracted from launch parameters after signature verification.
///
/// Attached to the request as an extension by the signature gate; handlers
/// treat these fields as authoritative and never re-derive the user id from
/// unverified input.
#[derive(Debug, Clone)]
pub struct VerifiedLaunch {
    /// Verified VK user id
    pub user_id: String,
    /// Verified VK application id
    pub app_id: String,
    /// Verified client platform (e.g. `mobile_android`)
    pub platform: String,
    /// The full raw parameter map, signature included
    pub params: LaunchParams,
}

/// A Mini App user who has opened the app or allowed community messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    /// VK user id (primary key)
    pub vk_user_id: String,
    /// VK community the user launched from, if known
    pub group_id: String,
    /// Brand key active at subscription time
    pub brand: String,
    /// Opt-in flag; cleared on unsubscribe
    pub subscribed: bool,
    /// Whether the user allowed messages from the community
    pub allowed_from_group: bool,
    /// First-seen timestamp
    pub created_at: DateTime<Utc>,
    /// Last opt-in timestamp
    pub subscribed_at: Option<DateTime<Utc>>,
    /// Last opt-out timestamp
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    /// A subscriber is reachable only while opted in with messages allowed.
    pub fn can_receive_messages(&self) -> bool {
        self.subscribed && self.allowed_from_group
    }
}

/// A partner loan offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub partner_name: String,
    pub logo_url: String,
    /// Loan amount range, in whole currency units
    pub sum_min: u64,
    pub sum_max: u64,
    /// Loan term range, in days
    pub term_min: u32,
    pub term_max: u32,
    /// Daily rate, percent
    pub rate: f64,
    pub rate_text: String,
    pub approval_time: String,
    pub features: Vec<String>,
    /// Partner URL template; `{sub_id}` is substituted on click-through
    pub redirect_url: String,
    pub is_active: bool,
}

/// Sort order for offer listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferSort {
    /// Cheapest daily rate first
    #[default]
    Rate,
    /// Largest maximum amount first
    Sum,
    /// Longest maximum term first
    Term,
}

/// Query against the offer catalog.
#[derive(Debug, Clone, Default)]
pub struct OfferQuery {
    /// Keep offers whose amount range covers this sum
    pub sum_need: Option<u64>,
    /// Keep offers whose term range covers this many days
    pub term_days: Option<u32>,
    pub sort: OfferSort,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

/// One page of offers plus paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferPage {
    pub results: Vec<Offer>,
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// A recorded click-through on an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRecord {
    pub offer_id: String,
    pub vk_user_id: Option<String>,
    pub group_id: Option<String>,
    pub brand: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A frontend-reported VK Ads pixel event (lead, subscribe, product_card...).
///
/// The frontend fires these into the VK Ads SDK and mirrors each attempt
/// here, including failed sends, so delivery problems are visible server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsEvent {
    pub event_name: String,
    pub vk_user_id: Option<String>,
    /// Free-form event payload, e.g. `{"offer_id": "10", "partner_name": ...}`
    pub event_params: Option<serde_json::Value>,
    /// Whether the SDK send succeeded on the client
    pub success: bool,
    pub error_message: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Client platform as reported by the frontend (iOS, Android, Web)
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Feature flags within a brand configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandFeatures {
    /// Default offer sort for this brand
    pub default_sort: OfferSort,
    pub show_filters: bool,
    pub show_disclaimer: bool,
    pub enable_messages: bool,
}

/// A named bundle of UI colors, copy and feature flags served to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Brand key this bundle is registered under
    pub brand: String,
    pub name: String,
    pub logo_url: String,
    /// Color palette, token name → hex value
    pub palette: HashMap<String, String>,
    /// UI copy, slot name → text
    pub copy: HashMap<String, String>,
    pub features: BrandFeatures,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_receive_messages() {
        let mut sub = Subscriber {
            vk_user_id: "42".into(),
            group_id: String::new(),
            brand: "kokos".into(),
            subscribed: true,
            allowed_from_group: true,
            created_at: Utc::now(),
            subscribed_at: Some(Utc::now()),
            unsubscribed_at: None,
        };
        assert!(sub.can_receive_messages());

        sub.subscribed = false;
        assert!(!sub.can_receive_messages());

        sub.subscribed = true;
        sub.allowed_from_group = false;
        assert!(!sub.can_receive_messages());
    }

    #[test]
    fn test_offer_sort_deserializes_lowercase() {
        let sort: OfferSort = serde_json::from_str("\"rate\"").unwrap();
        assert_eq!(sort, OfferSort::Rate);
        let sort: OfferSort = serde_json::from_str("\"sum\"").unwrap();
        assert_eq!(sort, OfferSort::Sum);
    }
}
