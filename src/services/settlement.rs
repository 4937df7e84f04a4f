//! Settlement Engine
//!
//! Position lifecycle: opening (market orders immediately, limit/stop
//! orders via the pending matcher), mark-to-market monitoring with
//! stop-loss and take-profit, and closing through the rigged outcome
//! engine. All balance movement goes through the portfolio ledger, and
//! every status transition relies on the store's check-and-set updates
//! so concurrent closes settle exactly once.

use crate::push::{PushEvent, PushHub};
use crate::services::email::{EmailSink, TradeClosedEmail};
use crate::services::ledger::PortfolioLedger;
use crate::services::outcome::OutcomeEngine;
use crate::services::price_cache::PriceCache;
use crate::services::store::{CloseRecord, SqliteStore};
use crate::types::money::{cash_str, price_str, round_cash};
use crate::types::{
    AssetType, CloseReason, Direction, OrderKind, Portfolio, Position, PositionStatus, SlTpMode,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stop-loss close with zero natural P&L loses this fraction of margin.
const STOP_LOSS_FRACTION: f64 = 0.05;
/// Take-profit close with zero natural P&L gains this fraction of margin.
const TAKE_PROFIT_FRACTION: f64 = 0.10;

#[derive(Debug, Error)]
pub enum TradingError {
    #[error("insufficient balance: need {needed:.2}, available {available:.2}")]
    InsufficientBalance { needed: f64, available: f64 },
    #[error("position not found: {0}")]
    PositionNotFound(String),
    #[error("position is not open: {0}")]
    PositionNotOpen(String),
    #[error("position is not pending: {0}")]
    PositionNotPending(String),
    #[error("no price available for {0}")]
    PriceUnavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionRequest {
    pub user_id: String,
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    pub direction: Direction,
    #[serde(flatten)]
    pub order: OrderKind,
    pub volume: f64,
    pub amount: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

pub struct SettlementEngine {
    store: Arc<SqliteStore>,
    prices: Arc<PriceCache>,
    ledger: PortfolioLedger,
    outcome: OutcomeEngine,
    push: Arc<PushHub>,
    email: Arc<dyn EmailSink>,
}

impl SettlementEngine {
    pub fn new(
        store: Arc<SqliteStore>,
        prices: Arc<PriceCache>,
        ledger: PortfolioLedger,
        outcome: OutcomeEngine,
        push: Arc<PushHub>,
        email: Arc<dyn EmailSink>,
    ) -> Self {
        Self {
            store,
            prices,
            ledger,
            outcome,
            push,
            email,
        }
    }

    // ---- opening ----

    pub fn open_position(&self, req: OpenPositionRequest) -> Result<Position, TradingError> {
        self.open_internal(req, None)
    }

    pub fn open_position_as_admin(
        &self,
        admin_id: &str,
        req: OpenPositionRequest,
    ) -> Result<Position, TradingError> {
        self.open_internal(req, Some(admin_id.to_string()))
    }

    /// Market orders open immediately: the current price is required,
    /// the balance is checked, and the margin debited up front. Limit
    /// and stop orders are stored pending with no balance check; the
    /// matcher debits when they trigger.
    fn open_internal(
        &self,
        req: OpenPositionRequest,
        admin_id: Option<String>,
    ) -> Result<Position, TradingError> {
        let now = chrono::Utc::now().timestamp_millis();
        let amount = round_cash(req.amount);

        let mut position = Position {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id.clone(),
            opened_by_admin: admin_id.is_some(),
            admin_id,
            symbol: req.symbol.to_lowercase(),
            name: req.name,
            asset_type: req.asset_type,
            direction: req.direction,
            order: req.order,
            volume: req.volume,
            amount,
            entry_price: None,
            current_price: None,
            stop_loss: req.stop_loss,
            take_profit: req.take_profit,
            unrealized_pnl: 0.0,
            admin_profit: 0.0,
            realized_pnl: None,
            status: PositionStatus::Pending,
            close_reason: None,
            created_at: now,
            opened_at: None,
            closed_at: None,
        };

        if position.order.is_market() {
            let price = self
                .prices
                .get_price(&position.symbol)
                .ok_or_else(|| TradingError::PriceUnavailable(position.symbol.clone()))?;

            let portfolio = self.ledger.ensure_portfolio(&position.user_id)?;
            if portfolio.balance < amount {
                return Err(TradingError::InsufficientBalance {
                    needed: amount,
                    available: portfolio.balance,
                });
            }

            position.status = PositionStatus::Open;
            position.entry_price = Some(price);
            position.current_price = Some(price);
            position.opened_at = Some(now);

            self.store.create_position(&position)?;
            self.ledger.debit_on_open(&position.user_id, amount)?;
            self.push.push_to_user(
                &position.user_id,
                &PushEvent::PositionOpened {
                    position: position.clone(),
                },
            );
            info!(
                position_id = %position.id,
                user_id = %position.user_id,
                symbol = %position.symbol,
                price,
                "market position opened"
            );
        } else {
            self.store.create_position(&position)?;
            info!(
                position_id = %position.id,
                user_id = %position.user_id,
                symbol = %position.symbol,
                order = position.order.kind_str(),
                "pending order placed"
            );
        }

        Ok(position)
    }

    // ---- closing ----

    /// User-initiated close; the final P&L goes through the rigged
    /// outcome engine.
    pub fn manual_close(&self, position_id: &str) -> Result<Position, TradingError> {
        self.close_rigged(position_id, CloseReason::Manual)
    }

    /// Admin-forced close. By default the settlement path is identical
    /// to a manual close with a distinct reason. When the quota is in
    /// admin-choose mode, the admin may instead dress the close as a
    /// stop-loss or take-profit, which settles with the bound's forced
    /// outcome and bypasses the quota.
    pub fn admin_close(
        &self,
        position_id: &str,
        requested: Option<CloseReason>,
    ) -> Result<Position, TradingError> {
        let quota = self.store.get_outcome_quota()?;
        if quota.sl_tp_mode == SlTpMode::AdminChoose {
            if let Some(reason @ (CloseReason::StopLoss | CloseReason::TakeProfit)) = requested {
                let position = self
                    .store
                    .get_position(position_id)?
                    .ok_or_else(|| TradingError::PositionNotFound(position_id.to_string()))?;
                if position.status != PositionStatus::Open {
                    return Err(TradingError::PositionNotOpen(position_id.to_string()));
                }
                let price = self
                    .prices
                    .get_price(&position.symbol)
                    .ok_or_else(|| TradingError::PriceUnavailable(position.symbol.clone()))?;
                return self.close_at_bound(position, price, reason);
            }
        }
        self.close_rigged(position_id, CloseReason::AdminClose)
    }

    fn close_rigged(
        &self,
        position_id: &str,
        reason: CloseReason,
    ) -> Result<Position, TradingError> {
        let position = self
            .store
            .get_position(position_id)?
            .ok_or_else(|| TradingError::PositionNotFound(position_id.to_string()))?;
        if position.status != PositionStatus::Open {
            return Err(TradingError::PositionNotOpen(position_id.to_string()));
        }

        let price = self
            .prices
            .get_price(&position.symbol)
            .ok_or_else(|| TradingError::PriceUnavailable(position.symbol.clone()))?;

        // claim the position before the outcome decision, so a close
        // that loses the race never consumes a quota slot
        if !self.store.begin_close(&position.id)? {
            return Err(TradingError::PositionNotOpen(position_id.to_string()));
        }

        let natural_pnl = position.compute_pnl(price);
        let final_pnl = match self.outcome.decide_and_record(natural_pnl, position.amount) {
            Ok(pnl) => pnl,
            Err(err) => {
                if let Err(revert_err) = self.store.revert_close(&position.id) {
                    warn!(position_id = %position.id, error = %revert_err, "revert of close claim failed");
                }
                return Err(err.into());
            }
        };
        self.settle(position, price, final_pnl, reason)
    }

    /// Close triggered by a stop-loss or take-profit bound. The outcome
    /// is fixed by the bound's meaning and never consumes quota: a stop
    /// loss always loses, a take profit always gains.
    fn close_at_bound(
        &self,
        position: Position,
        price: f64,
        reason: CloseReason,
    ) -> Result<Position, TradingError> {
        if !self.store.begin_close(&position.id)? {
            return Err(TradingError::PositionNotOpen(position.id.clone()));
        }

        let natural = position.compute_pnl(price).abs();
        let final_pnl = match reason {
            CloseReason::StopLoss => {
                let magnitude = if natural == 0.0 {
                    round_cash(position.amount * STOP_LOSS_FRACTION)
                } else {
                    natural
                };
                -magnitude
            }
            _ => {
                if natural == 0.0 {
                    round_cash(position.amount * TAKE_PROFIT_FRACTION)
                } else {
                    natural
                }
            }
        };
        self.settle(position, price, final_pnl, reason)
    }

    /// Shared settlement tail. The caller holds the closing claim, so
    /// finalizing cannot race another close; the ledger is credited
    /// exactly once.
    fn settle(
        &self,
        position: Position,
        price: f64,
        final_pnl: f64,
        reason: CloseReason,
    ) -> Result<Position, TradingError> {
        let realized_pnl = round_cash(final_pnl + position.admin_profit);
        let record = CloseRecord {
            close_price: price,
            realized_pnl,
            close_reason: reason,
            closed_at: chrono::Utc::now().timestamp_millis(),
        };

        if !self.store.finish_close(&position.id, &record)? {
            return Err(TradingError::PositionNotOpen(position.id.clone()));
        }

        self.ledger
            .credit_on_close(&position.user_id, position.amount, final_pnl)?;

        let mut closed = position;
        closed.status = PositionStatus::Closed;
        closed.current_price = Some(price);
        closed.realized_pnl = Some(realized_pnl);
        closed.unrealized_pnl = realized_pnl;
        closed.close_reason = Some(reason);
        closed.closed_at = Some(record.closed_at);

        info!(
            position_id = %closed.id,
            user_id = %closed.user_id,
            realized_pnl,
            reason = %reason,
            "position closed"
        );

        self.push.push_to_user(
            &closed.user_id,
            &PushEvent::PositionClosed {
                position: closed.clone(),
                realized_pnl,
            },
        );
        self.notify_by_email(&closed, price, realized_pnl, reason);

        Ok(closed)
    }

    /// Best effort: users without contact details are skipped silently.
    fn notify_by_email(&self, position: &Position, price: f64, realized_pnl: f64, reason: CloseReason) {
        let contact = match self.store.get_user_contact(&position.user_id) {
            Ok(Some(contact)) => contact,
            Ok(None) => return,
            Err(err) => {
                warn!(user_id = %position.user_id, error = %err, "contact lookup failed");
                return;
            }
        };

        let summary = TradeClosedEmail {
            position_id: position.id.clone(),
            symbol: position.symbol.clone(),
            direction: position.direction.to_string(),
            volume: price_str(position.volume),
            amount: cash_str(position.amount),
            entry_price: price_str(position.entry_price.unwrap_or(price)),
            close_price: price_str(price),
            realized_pnl: cash_str(realized_pnl),
            close_reason: reason.to_string(),
        };
        self.email
            .send_trade_closed(&contact.email, &contact.first_name, &summary);
    }

    // ---- cancelling ----

    /// Cancel a pending order. Ledger-neutral: pending orders never
    /// debited anything, so nothing is refunded.
    pub fn cancel_pending(&self, position_id: &str) -> Result<Position, TradingError> {
        let position = self
            .store
            .get_position(position_id)?
            .ok_or_else(|| TradingError::PositionNotFound(position_id.to_string()))?;
        if position.status != PositionStatus::Pending {
            return Err(TradingError::PositionNotPending(position_id.to_string()));
        }

        let now = chrono::Utc::now().timestamp_millis();
        if !self.store.cancel_pending(position_id, now)? {
            return Err(TradingError::PositionNotPending(position_id.to_string()));
        }

        self.push.push_to_user(
            &position.user_id,
            &PushEvent::OrderCancelled {
                position_id: position_id.to_string(),
                timestamp: now,
            },
        );
        info!(position_id, user_id = %position.user_id, "pending order cancelled");

        let mut cancelled = position;
        cancelled.status = PositionStatus::Cancelled;
        cancelled.close_reason = Some(CloseReason::Cancelled);
        cancelled.closed_at = Some(now);
        Ok(cancelled)
    }

    // ---- periodic sweeps ----

    /// One matcher pass over pending orders. Symbols without a cached
    /// price are skipped; per-order failures are logged and do not stop
    /// the sweep. Returns the number of orders opened.
    pub fn match_pending_orders(&self) -> Result<usize, TradingError> {
        let pending = self.store.list_by_status(PositionStatus::Pending)?;
        let mut opened = 0;

        for position in pending {
            let price = match self.prices.get_price(&position.symbol) {
                Some(p) => p,
                None => continue,
            };
            if !position.should_trigger(price) {
                continue;
            }

            let now = chrono::Utc::now().timestamp_millis();
            match self.store.open_pending(&position.id, price, now) {
                Ok(true) => {
                    if let Err(err) = self.ledger.debit_on_open(&position.user_id, position.amount)
                    {
                        warn!(position_id = %position.id, error = %err, "debit on trigger failed");
                        continue;
                    }
                    let mut triggered = position;
                    triggered.status = PositionStatus::Open;
                    triggered.entry_price = Some(price);
                    triggered.current_price = Some(price);
                    triggered.opened_at = Some(now);
                    info!(
                        position_id = %triggered.id,
                        symbol = %triggered.symbol,
                        price,
                        "pending order triggered"
                    );
                    let user_id = triggered.user_id.clone();
                    self.push.push_to_user(
                        &user_id,
                        &PushEvent::PositionOpened {
                            position: triggered,
                        },
                    );
                    opened += 1;
                }
                Ok(false) => {
                    // cancelled between listing and the update
                    debug!(position_id = %position.id, "pending order gone before trigger");
                }
                Err(err) => {
                    warn!(position_id = %position.id, error = %err, "trigger update failed");
                }
            }
        }

        Ok(opened)
    }

    /// One monitor pass over open positions: refresh the mark, then
    /// close anything past its bounds. Stop-loss is checked before
    /// take-profit, so when a price move satisfies both the position
    /// closes as a stop-loss.
    pub fn monitor_open_positions(&self) -> Result<(), TradingError> {
        let open = self.store.list_by_status(PositionStatus::Open)?;

        for position in open {
            let price = match self.prices.get_price(&position.symbol) {
                Some(p) => p,
                None => continue,
            };

            let result = if position.stop_loss_hit(price) {
                self.close_at_bound(position, price, CloseReason::StopLoss)
                    .map(|_| ())
            } else if position.take_profit_hit(price) {
                self.close_at_bound(position, price, CloseReason::TakeProfit)
                    .map(|_| ())
            } else {
                let mut position = position;
                position.mark_to_market(price);
                self.store
                    .update_mark(&position.id, price, position.unrealized_pnl)
                    .map_err(TradingError::from)
                    .map(|_| {
                        self.push.push_to_user(
                            &position.user_id,
                            &PushEvent::PositionUpdate {
                                position_id: position.id.clone(),
                                symbol: position.symbol.clone(),
                                current_price: price,
                                unrealized_pnl: position.unrealized_pnl,
                                timestamp: chrono::Utc::now().timestamp_millis(),
                            },
                        );
                    })
            };

            if let Err(err) = result {
                // a concurrent manual close racing the monitor is expected
                match err {
                    TradingError::PositionNotOpen(id) => {
                        debug!(position_id = %id, "position settled elsewhere during monitor pass");
                    }
                    other => warn!(error = %other, "monitor settlement failed"),
                }
            }
        }

        Ok(())
    }

    // ---- admin and queries ----

    /// Set the manual profit overlay on an open position. The overlay
    /// is added on top of the engine P&L at close time.
    pub fn set_admin_profit(
        &self,
        position_id: &str,
        profit: f64,
    ) -> Result<Position, TradingError> {
        if !self.store.set_admin_profit(position_id, round_cash(profit))? {
            // distinguish missing from merely not-open
            return match self.store.get_position(position_id)? {
                Some(_) => Err(TradingError::PositionNotOpen(position_id.to_string())),
                None => Err(TradingError::PositionNotFound(position_id.to_string())),
            };
        }
        self.store
            .get_position(position_id)?
            .ok_or_else(|| TradingError::PositionNotFound(position_id.to_string()))
    }

    pub fn get_position(&self, position_id: &str) -> Result<Position, TradingError> {
        self.store
            .get_position(position_id)?
            .ok_or_else(|| TradingError::PositionNotFound(position_id.to_string()))
    }

    pub fn list_user_positions(&self, user_id: &str) -> Result<Vec<Position>, TradingError> {
        Ok(self.store.list_user_positions(user_id)?)
    }

    pub fn list_positions_by_status(
        &self,
        status: PositionStatus,
    ) -> Result<Vec<Position>, TradingError> {
        Ok(self.store.list_by_status(status)?)
    }

    pub fn get_portfolio(&self, user_id: &str) -> Result<Portfolio, TradingError> {
        Ok(self.ledger.ensure_portfolio(user_id)?)
    }
}
