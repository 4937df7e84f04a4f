//! Simulated Price Feed
//!
//! Random-walks each configured symbol around its seed price and writes
//! the result into the price cache on a fixed interval. Stands in for a
//! real market data source.

use crate::services::price_cache::PriceCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Max per-tick move as a fraction of the current price.
const MAX_STEP: f64 = 0.004;

pub struct SimulatedFeed {
    prices: Arc<PriceCache>,
    symbols: Vec<(String, f64)>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SimulatedFeed {
    pub fn new(prices: Arc<PriceCache>, symbols: Vec<(String, f64)>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            prices,
            symbols,
            shutdown_tx,
        }
    }

    pub fn start(&self, interval: Duration) {
        // seed the cache so market orders work before the first tick
        for (symbol, price) in &self.symbols {
            self.prices.set_price(symbol, *price);
        }
        info!(symbols = self.symbols.len(), "simulated feed started");

        let prices = self.prices.clone();
        let symbols = self.symbols.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // ThreadRng is not Send, so the task owns its own StdRng
            let mut rng = StdRng::from_entropy();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for (symbol, _) in &symbols {
                            if let Some(current) = prices.get_price(symbol) {
                                let step = rng.gen_range(-MAX_STEP..=MAX_STEP);
                                let next = (current * (1.0 + step)).max(f64::MIN_POSITIVE);
                                prices.set_price(symbol, next);
                                debug!(symbol = symbol.as_str(), price = next, "feed tick");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("simulated feed stopped");
                        break;
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
