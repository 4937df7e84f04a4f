//! Outcome Quota Types
//!
//! Server-wide knobs for the rigged-outcome engine. A single row in the
//! store holds the quota; counters roll over automatically once a full
//! cycle of trades has been decided.

use serde::{Deserialize, Serialize};

/// How a close is settled when both stop-loss and take-profit are
/// plausible interpretations of an admin-forced close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlTpMode {
    /// Natural SL/TP checks decide; stop-loss wins when both hit.
    NaturalPriority,
    /// Admin picks the reason explicitly when force-closing.
    AdminChoose,
}

impl SlTpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlTpMode::NaturalPriority => "natural_priority",
            SlTpMode::AdminChoose => "admin_choose",
        }
    }
}

/// Win/loss quota for manually closed trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeQuota {
    /// Cycle length; counters reset when wins + losses reach this
    pub total_trades: i64,
    /// Wins allowed per cycle
    pub win_trades: i64,
    /// Losses allowed per cycle
    pub loss_trades: i64,
    /// Wins dealt so far this cycle
    pub current_wins: i64,
    /// Losses dealt so far this cycle
    pub current_losses: i64,
    pub sl_tp_mode: SlTpMode,
    /// When inactive, natural P&L passes through untouched
    pub active: bool,
}

impl OutcomeQuota {
    pub fn remaining_wins(&self) -> i64 {
        self.win_trades - self.current_wins
    }

    pub fn remaining_losses(&self) -> i64 {
        self.loss_trades - self.current_losses
    }

    pub fn remaining(&self) -> i64 {
        self.remaining_wins() + self.remaining_losses()
    }
}

impl Default for OutcomeQuota {
    fn default() -> Self {
        Self {
            total_trades: 10,
            win_trades: 3,
            loss_trades: 7,
            current_wins: 0,
            current_losses: 0,
            sl_tp_mode: SlTpMode::NaturalPriority,
            active: false,
        }
    }
}
