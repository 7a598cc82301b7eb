//! Outbound ports for the gateway's collaborators, plus in-memory adapters.
//!
//! Handlers depend only on these traits; the runtime chooses the adapters.
//! The in-memory implementations in [`memory`] back development deployments
//! and the test suite.

pub mod memory;

use crate::domain::types::{
    AdsEvent, BrandConfig, ClickRecord, Offer, OfferPage, OfferQuery, Subscriber,
};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::{
    InMemoryAdsEvents, InMemoryBrands, InMemoryClicks, InMemoryOffers, InMemorySubscribers,
};

/// Store-level errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Subscriber record persistence.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Look up a subscriber by user id.
    async fn get(&self, vk_user_id: &str) -> Option<Subscriber>;

    /// Get-or-create keyed by user id, marking the user subscribed. Returns
    /// the record and whether it was newly created. An existing record is
    /// re-subscribed if previously opted out, and its group/brand are
    /// refreshed when provided.
    async fn subscribe(
        &self,
        vk_user_id: &str,
        group_id: Option<&str>,
        brand: Option<&str>,
    ) -> (Subscriber, bool);

    /// Mark a subscriber opted out. `None` when the user is unknown.
    async fn unsubscribe(&self, vk_user_id: &str) -> Option<Subscriber>;

    /// Update the messages-allowed flag. With `create_if_missing`, an unknown
    /// user gets a fresh record (the VK callback can arrive before the app is
    /// ever opened). Otherwise `None` for unknown users.
    async fn set_messages_allowed(
        &self,
        vk_user_id: &str,
        allowed: bool,
        create_if_missing: bool,
    ) -> Option<Subscriber>;
}

/// Partner offer catalog.
#[async_trait]
pub trait OfferCatalog: Send + Sync {
    /// List active offers matching the query, filtered, sorted and paginated.
    async fn list(&self, query: &OfferQuery) -> OfferPage;

    /// Fetch an active offer by id.
    async fn get(&self, offer_id: &str) -> Option<Offer>;
}

/// Click-through logging.
#[async_trait]
pub trait ClickLogger: Send + Sync {
    /// Record a click. Callers log failures and continue; a lost click never
    /// blocks the redirect.
    async fn record(&self, click: ClickRecord) -> Result<(), StoreError>;
}

/// VK Ads event logging.
#[async_trait]
pub trait AdsEventLog: Send + Sync {
    /// Record a frontend ad event and return its assigned id. Callers treat
    /// failures as best-effort: the event is dropped, not the request.
    async fn record(&self, event: AdsEvent) -> Result<u64, StoreError>;
}

/// Brand configuration lookup.
#[async_trait]
pub trait BrandStore: Send + Sync {
    /// Resolve the active brand configuration. Priority: explicit `brand`
    /// override, then the community mapping for `group_id`, then the default.
    async fn get_active(
        &self,
        brand: Option<&str>,
        group_id: Option<&str>,
        default_brand: &str,
    ) -> BrandConfig;
}
