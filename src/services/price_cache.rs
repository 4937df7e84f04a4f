//! Price Cache
//!
//! In-memory snapshot of the latest price per symbol. Written by the
//! simulated feed, read by the settlement engine. Symbols are keyed
//! lowercase so lookups are case-insensitive.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrice {
    pub symbol: String,
    pub price: f64,
    pub updated_at: i64,
}

#[derive(Default)]
pub struct PriceCache {
    prices: DashMap<String, CachedPrice>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        let key = symbol.to_lowercase();
        self.prices.insert(
            key.clone(),
            CachedPrice {
                symbol: key,
                price,
                updated_at: chrono::Utc::now().timestamp_millis(),
            },
        );
    }

    pub fn get_price(&self, symbol: &str) -> Option<f64> {
        self.prices
            .get(&symbol.to_lowercase())
            .map(|entry| entry.price)
    }

    pub fn all_prices(&self) -> Vec<CachedPrice> {
        self.prices.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
