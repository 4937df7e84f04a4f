//! Server configuration, read from environment variables with sensible
//! defaults for local development.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    /// Matcher/monitor tick interval in milliseconds
    pub settle_interval_ms: u64,
    /// Simulated feed tick interval in milliseconds
    pub feed_interval_ms: u64,
    /// Symbols the feed random-walks, with their seed prices
    pub feed_symbols: Vec<(String, f64)>,
    /// Starting balance for newly created portfolios
    pub default_balance: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("TRADEMILL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("TRADEMILL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            db_path: env::var("TRADEMILL_DB_PATH").unwrap_or_else(|_| "trademill.db".to_string()),
            settle_interval_ms: env::var("TRADEMILL_SETTLE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            feed_interval_ms: env::var("TRADEMILL_FEED_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            feed_symbols: env::var("TRADEMILL_FEED_SYMBOLS")
                .map(|v| parse_symbols(&v))
                .unwrap_or_else(|_| default_symbols()),
            default_balance: env::var("TRADEMILL_DEFAULT_BALANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000.0),
        }
    }
}

/// Parse "btc:65000,eth:3500" into symbol/seed-price pairs. Malformed
/// entries are skipped.
fn parse_symbols(raw: &str) -> Vec<(String, f64)> {
    raw.split(',')
        .filter_map(|entry| {
            let (symbol, price) = entry.split_once(':')?;
            let symbol = symbol.trim().to_lowercase();
            let price: f64 = price.trim().parse().ok()?;
            if symbol.is_empty() || price <= 0.0 {
                return None;
            }
            Some((symbol, price))
        })
        .collect()
}

fn default_symbols() -> Vec<(String, f64)> {
    vec![
        ("btc".to_string(), 65000.0),
        ("eth".to_string(), 3500.0),
        ("sol".to_string(), 150.0),
        ("xrp".to_string(), 0.55),
    ]
}
