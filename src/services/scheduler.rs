//! Settlement Scheduler
//!
//! Drives the pending-order matcher and the open-position monitor on a
//! fixed interval. Each tick runs both sweeps to completion before the
//! next tick is considered, so a slow pass delays the schedule instead
//! of overlapping with itself.

use crate::services::settlement::SettlementEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub struct SettlementScheduler {
    engine: Arc<SettlementEngine>,
    shutdown_tx: broadcast::Sender<()>,
    running: RwLock<bool>,
}

impl SettlementScheduler {
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            engine,
            shutdown_tx,
            running: RwLock::new(false),
        }
    }

    pub async fn start(&self, interval: Duration) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }

        let engine = self.engine.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(interval_ms = interval.as_millis() as u64, "settlement scheduler started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.match_pending_orders() {
                            Ok(opened) if opened > 0 => {
                                debug!(opened, "matcher pass opened orders");
                            }
                            Ok(_) => {}
                            Err(err) => error!(error = %err, "matcher pass failed"),
                        }
                        if let Err(err) = engine.monitor_open_positions() {
                            error!(error = %err, "monitor pass failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("settlement scheduler stopped");
                        break;
                    }
                }
            }
        });
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        if *running {
            *running = false;
            let _ = self.shutdown_tx.send(());
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
