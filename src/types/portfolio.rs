//! Portfolio Types

use serde::{Deserialize, Serialize};

/// Per-user cash ledger.
///
/// Balance only moves through the portfolio ledger: debited when a
/// position opens, credited with margin plus final P&L when it closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub user_id: String,
    /// Available cash, never negative
    pub balance: f64,
    /// Lifetime realized P&L
    pub total_profit: f64,
    /// total_profit as a percentage of the current balance
    pub total_profit_percent: f64,
    pub created_at: i64,
    pub updated_at: i64,
}
