//! Portfolio Ledger
//!
//! The only component allowed to move portfolio balances. Opens debit
//! the committed margin, closes credit margin plus final P&L, and
//! cancellations never touch the ledger at all.

use crate::services::store::SqliteStore;
use crate::types::money::round_cash;
use crate::types::Portfolio;
use std::sync::Arc;
use tracing::debug;

pub struct PortfolioLedger {
    store: Arc<SqliteStore>,
    default_balance: f64,
}

impl PortfolioLedger {
    pub fn new(store: Arc<SqliteStore>, default_balance: f64) -> Self {
        Self {
            store,
            default_balance,
        }
    }

    /// Fetch the user's portfolio, creating one with the default
    /// starting balance on first touch.
    pub fn ensure_portfolio(&self, user_id: &str) -> Result<Portfolio, rusqlite::Error> {
        if let Some(portfolio) = self.store.get_portfolio(user_id)? {
            return Ok(portfolio);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let portfolio = Portfolio {
            user_id: user_id.to_string(),
            balance: self.default_balance,
            total_profit: 0.0,
            total_profit_percent: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.store.create_portfolio(&portfolio)?;
        debug!(user_id, balance = portfolio.balance, "created portfolio");
        Ok(portfolio)
    }

    /// Debit the committed margin when a position opens. The balance is
    /// clamped at zero rather than allowed to go negative.
    pub fn debit_on_open(&self, user_id: &str, amount: f64) -> Result<Portfolio, rusqlite::Error> {
        let mut portfolio = self.ensure_portfolio(user_id)?;
        portfolio.balance = round_cash((portfolio.balance - amount).max(0.0));
        portfolio.updated_at = chrono::Utc::now().timestamp_millis();
        self.store.set_balance_and_profit(
            user_id,
            portfolio.balance,
            portfolio.total_profit,
            portfolio.total_profit_percent,
            portfolio.updated_at,
        )?;
        debug!(user_id, amount, balance = portfolio.balance, "debited margin");
        Ok(portfolio)
    }

    /// Credit margin plus final P&L when a position settles, and roll
    /// the profit totals forward.
    pub fn credit_on_close(
        &self,
        user_id: &str,
        amount: f64,
        final_pnl: f64,
    ) -> Result<Portfolio, rusqlite::Error> {
        let mut portfolio = self.ensure_portfolio(user_id)?;
        portfolio.balance = round_cash(portfolio.balance + amount + final_pnl);
        portfolio.total_profit = round_cash(portfolio.total_profit + final_pnl);
        portfolio.total_profit_percent = if portfolio.balance > 0.0 {
            portfolio.total_profit / portfolio.balance * 100.0
        } else {
            0.0
        };
        portfolio.updated_at = chrono::Utc::now().timestamp_millis();
        self.store.set_balance_and_profit(
            user_id,
            portfolio.balance,
            portfolio.total_profit,
            portfolio.total_profit_percent,
            portfolio.updated_at,
        )?;
        debug!(
            user_id,
            amount,
            final_pnl,
            balance = portfolio.balance,
            "credited settlement"
        );
        Ok(portfolio)
    }
}
