//! In-memory adapters for the outbound ports.
//!
//! Backing storage is a `parking_lot` lock around plain collections. The
//! offer and brand adapters ship with demo data mirroring a small white-label
//! deployment, used by development runs and the test suite.

use super::{AdsEventLog, BrandStore, ClickLogger, OfferCatalog, StoreError, SubscriberStore};
use crate::domain::types::{
    AdsEvent, BrandConfig, BrandFeatures, ClickRecord, Offer, OfferPage, OfferQuery, OfferSort,
    Subscriber,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Subscriber records keyed by user id.
#[derive(Default)]
pub struct InMemorySubscribers {
    inner: RwLock<HashMap<String, Subscriber>>,
}

impl InMemorySubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored subscribers.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscribers {
    async fn get(&self, vk_user_id: &str) -> Option<Subscriber> {
        self.inner.read().get(vk_user_id).cloned()
    }

    async fn subscribe(
        &self,
        vk_user_id: &str,
        group_id: Option<&str>,
        brand: Option<&str>,
    ) -> (Subscriber, bool) {
        let mut inner = self.inner.write();
        let now = Utc::now();

        if let Some(existing) = inner.get_mut(vk_user_id) {
            if !existing.subscribed {
                existing.subscribed = true;
                existing.subscribed_at = Some(now);
                existing.unsubscribed_at = None;
            }
            if let Some(group_id) = group_id {
                if existing.group_id != group_id {
                    existing.group_id = group_id.to_string();
                }
            }
            if let Some(brand) = brand {
                if existing.brand != brand {
                    existing.brand = brand.to_string();
                }
            }
            return (existing.clone(), false);
        }

        let subscriber = Subscriber {
            vk_user_id: vk_user_id.to_string(),
            group_id: group_id.unwrap_or("").to_string(),
            brand: brand.unwrap_or("default").to_string(),
            subscribed: true,
            allowed_from_group: false,
            created_at: now,
            subscribed_at: Some(now),
            unsubscribed_at: None,
        };
        inner.insert(vk_user_id.to_string(), subscriber.clone());
        (subscriber, true)
    }

    async fn unsubscribe(&self, vk_user_id: &str) -> Option<Subscriber> {
        let mut inner = self.inner.write();
        let subscriber = inner.get_mut(vk_user_id)?;
        subscriber.subscribed = false;
        subscriber.unsubscribed_at = Some(Utc::now());
        Some(subscriber.clone())
    }

    async fn set_messages_allowed(
        &self,
        vk_user_id: &str,
        allowed: bool,
        create_if_missing: bool,
    ) -> Option<Subscriber> {
        let mut inner = self.inner.write();
        let now = Utc::now();

        if let Some(subscriber) = inner.get_mut(vk_user_id) {
            subscriber.allowed_from_group = allowed;
            if allowed && subscriber.subscribed_at.is_none() {
                subscriber.subscribed_at = Some(now);
            }
            return Some(subscriber.clone());
        }

        if !create_if_missing {
            return None;
        }

        let subscriber = Subscriber {
            vk_user_id: vk_user_id.to_string(),
            group_id: String::new(),
            brand: "default".to_string(),
            subscribed: true,
            allowed_from_group: allowed,
            created_at: now,
            subscribed_at: Some(now),
            unsubscribed_at: None,
        };
        inner.insert(vk_user_id.to_string(), subscriber.clone());
        Some(subscriber)
    }
}

/// Fixed offer catalog.
pub struct InMemoryOffers {
    offers: Vec<Offer>,
}

impl InMemoryOffers {
    pub fn new(offers: Vec<Offer>) -> Self {
        Self { offers }
    }

    /// Demo catalog for development deployments.
    pub fn demo() -> Self {
        Self::new(vec![
            demo_offer("offer_1", "QuickCash", 1_000, 30_000, 7, 30, 0.5, "15 minutes"),
            demo_offer("offer_2", "MigCredit", 5_000, 100_000, 10, 365, 1.0, "30 minutes"),
            demo_offer("offer_3", "MoneyNow", 2_000, 50_000, 5, 60, 0.8, "10 minutes"),
            demo_offer("offer_4", "LightMoney", 3_000, 70_000, 14, 180, 1.2, "20 minutes"),
            demo_offer("offer_5", "WebLoan", 1_000, 40_000, 7, 90, 0.6, "25 minutes"),
        ])
    }
}

fn demo_offer(
    id: &str,
    partner: &str,
    sum_min: u64,
    sum_max: u64,
    term_min: u32,
    term_max: u32,
    rate: f64,
    approval_time: &str,
) -> Offer {
    Offer {
        id: id.to_string(),
        partner_name: partner.to_string(),
        logo_url: format!("https://cdn.example.com/logos/{id}.png"),
        sum_min,
        sum_max,
        term_min,
        term_max,
        rate,
        rate_text: format!("{rate}% per day"),
        approval_time: approval_time.to_string(),
        features: vec!["Online".to_string(), "To card".to_string()],
        redirect_url: format!("https://partners.example.com/{id}?sub_id={{sub_id}}"),
        is_active: true,
    }
}

#[async_trait]
impl OfferCatalog for InMemoryOffers {
    async fn list(&self, query: &OfferQuery) -> OfferPage {
        let mut offers: Vec<Offer> = self
            .offers
            .iter()
            .filter(|o| o.is_active)
            .filter(|o| {
                query
                    .sum_need
                    .map(|sum| o.sum_min <= sum && sum <= o.sum_max)
                    .unwrap_or(true)
            })
            .filter(|o| {
                query
                    .term_days
                    .map(|term| o.term_min <= term && term <= o.term_max)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        match query.sort {
            OfferSort::Rate => {
                offers.sort_by(|a, b| a.rate.partial_cmp(&b.rate).unwrap_or(std::cmp::Ordering::Equal))
            }
            OfferSort::Sum => offers.sort_by(|a, b| b.sum_max.cmp(&a.sum_max)),
            OfferSort::Term => offers.sort_by(|a, b| b.term_max.cmp(&a.term_max)),
        }

        let count = offers.len();
        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        let total_pages = count.div_ceil(page_size);
        // Page numbers come straight from the query string; saturate rather
        // than trust them to stay in range.
        let start = page.saturating_sub(1).saturating_mul(page_size);
        let results: Vec<Offer> = offers.into_iter().skip(start).take(page_size).collect();

        OfferPage {
            results,
            count,
            page,
            page_size,
            total_pages,
        }
    }

    async fn get(&self, offer_id: &str) -> Option<Offer> {
        self.offers
            .iter()
            .find(|o| o.id == offer_id && o.is_active)
            .cloned()
    }
}

/// Click log kept in memory.
#[derive(Default)]
pub struct InMemoryClicks {
    inner: RwLock<Vec<ClickRecord>>,
}

impl InMemoryClicks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of recorded clicks, newest last.
    pub fn snapshot(&self) -> Vec<ClickRecord> {
        self.inner.read().clone()
    }
}

#[async_trait]
impl ClickLogger for InMemoryClicks {
    async fn record(&self, click: ClickRecord) -> Result<(), StoreError> {
        self.inner.write().push(click);
        Ok(())
    }
}

/// Ad event log kept in memory. Ids are assigned sequentially from 1.
#[derive(Default)]
pub struct InMemoryAdsEvents {
    inner: RwLock<Vec<AdsEvent>>,
}

impl InMemoryAdsEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of recorded events, newest last.
    pub fn snapshot(&self) -> Vec<AdsEvent> {
        self.inner.read().clone()
    }
}

#[async_trait]
impl AdsEventLog for InMemoryAdsEvents {
    async fn record(&self, event: AdsEvent) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        inner.push(event);
        Ok(inner.len() as u64)
    }
}

/// Brand configurations plus the community → brand mapping.
pub struct InMemoryBrands {
    configs: HashMap<String, BrandConfig>,
    group_map: HashMap<String, String>,
}

impl InMemoryBrands {
    pub fn new(configs: HashMap<String, BrandConfig>, group_map: HashMap<String, String>) -> Self {
        Self { configs, group_map }
    }

    /// Demo brands for development deployments.
    pub fn demo() -> Self {
        let mut configs = HashMap::new();
        configs.insert(
            "kokos".to_string(),
            demo_brand("kokos", "Kokos Loans", "#FF6B35", OfferSort::Rate),
        );
        configs.insert(
            "kubyshka".to_string(),
            demo_brand("kubyshka", "Kubyshka Loans", "#4A90E2", OfferSort::Sum),
        );

        let mut group_map = HashMap::new();
        group_map.insert("123456789".to_string(), "kokos".to_string());
        group_map.insert("987654321".to_string(), "kubyshka".to_string());

        Self::new(configs, group_map)
    }
}

fn demo_brand(key: &str, name: &str, primary: &str, default_sort: OfferSort) -> BrandConfig {
    let mut palette = HashMap::new();
    palette.insert("primary".to_string(), primary.to_string());
    palette.insert("background".to_string(), "#FFFFFF".to_string());
    palette.insert("text".to_string(), "#000000".to_string());

    let mut copy = HashMap::new();
    copy.insert("title".to_string(), name.to_string());
    copy.insert("subtitle".to_string(), "Fast loans online".to_string());
    copy.insert("cta".to_string(), "Get money".to_string());
    copy.insert(
        "disclaimer".to_string(),
        "The service is not a lender; it helps compare offers.".to_string(),
    );

    BrandConfig {
        brand: key.to_string(),
        name: name.to_string(),
        logo_url: format!("https://cdn.example.com/brands/{key}.png"),
        palette,
        copy,
        features: BrandFeatures {
            default_sort,
            show_filters: true,
            show_disclaimer: true,
            enable_messages: true,
        },
    }
}

#[async_trait]
impl BrandStore for InMemoryBrands {
    async fn get_active(
        &self,
        brand: Option<&str>,
        group_id: Option<&str>,
        default_brand: &str,
    ) -> BrandConfig {
        let key = brand
            .filter(|b| self.configs.contains_key(*b))
            .map(str::to_string)
            .or_else(|| group_id.and_then(|g| self.group_map.get(g).cloned()))
            .unwrap_or_else(|| default_brand.to_string());

        if let Some(config) = self.configs.get(&key) {
            return config.clone();
        }

        // Unknown default: fall back to any registered brand rather than 500.
        self.configs
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| demo_brand(default_brand, default_brand, "#000000", OfferSort::Rate))
    }
}
