//! Position Types
//!
//! A position is one simulated leveraged trade, tracked from creation
//! (pending or open) to closure. Trigger and stop/take-profit predicates
//! live on the type so the matcher and monitor stay thin.

use crate::types::money::round_cash;
use serde::{Deserialize, Serialize};

/// Asset category for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Crypto,
    Stock,
    Etf,
    Forex,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Crypto => write!(f, "crypto"),
            AssetType::Stock => write!(f, "stock"),
            AssetType::Etf => write!(f, "etf"),
            AssetType::Forex => write!(f, "forex"),
        }
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind. Trigger price only exists for limit and stop orders,
/// enforced at the type level rather than by optional-field convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orderType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OrderKind {
    /// Enters directly as an open position at the current price.
    Market,
    /// Waits for a favorable price crossing before opening.
    Limit { trigger_price: f64 },
    /// Waits for an adverse price crossing before opening.
    Stop { trigger_price: f64 },
}

impl OrderKind {
    pub fn is_market(&self) -> bool {
        matches!(self, OrderKind::Market)
    }

    pub fn trigger_price(&self) -> Option<f64> {
        match self {
            OrderKind::Market => None,
            OrderKind::Limit { trigger_price } | OrderKind::Stop { trigger_price } => {
                Some(*trigger_price)
            }
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "market",
            OrderKind::Limit { .. } => "limit",
            OrderKind::Stop { .. } => "stop",
        }
    }
}

/// Position lifecycle state.
///
/// Legal transitions: pending -> {open, cancelled}; open -> closing ->
/// {closed, open}. Closing is a transient claim held while a settlement
/// is deciding the outcome; it backs off to open only if that decision
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Pending,
    Open,
    Closing,
    Closed,
    Cancelled,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Pending => "pending",
            PositionStatus::Open => "open",
            PositionStatus::Closing => "closing",
            PositionStatus::Closed => "closed",
            PositionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a position left the open/pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Manual,
    StopLoss,
    TakeProfit,
    AdminClose,
    Cancelled,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Manual => "manual",
            CloseReason::StopLoss => "stop_loss",
            CloseReason::TakeProfit => "take_profit",
            CloseReason::AdminClose => "admin_close",
            CloseReason::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Unique position ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Admin who opened this position on the user's behalf, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    /// Whether an admin opened this position
    #[serde(default)]
    pub opened_by_admin: bool,
    /// Instrument symbol (e.g. "btc")
    pub symbol: String,
    /// Instrument display name
    pub name: String,
    /// Asset category
    pub asset_type: AssetType,
    /// Buy or sell
    pub direction: Direction,
    /// Market, limit or stop
    #[serde(flatten)]
    pub order: OrderKind,
    /// Units of the instrument
    pub volume: f64,
    /// Cash margin committed, fixed at creation
    pub amount: f64,
    /// Price fixed at open or trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    /// Latest observed market price while open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    /// Optional stop-loss bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    /// Optional take-profit bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    /// Mark-to-market P&L, refreshed every tick while open
    #[serde(default)]
    pub unrealized_pnl: f64,
    /// Manual additive overlay, independent of engine P&L
    #[serde(default)]
    pub admin_profit: f64,
    /// Final P&L locked in at close (includes the admin overlay)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<f64>,
    /// Lifecycle state
    pub status: PositionStatus,
    /// Set when the position leaves pending/open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<CloseReason>,
    /// When the position was created (ms)
    pub created_at: i64,
    /// When the position entered the open state (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<i64>,
    /// When the position was closed or cancelled (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl Position {
    /// Compute P&L against the committed margin at the given price.
    ///
    /// pnl = (priceDelta / entryPrice) * amount, where priceDelta is
    /// signed by direction. Returns 0 when no entry price is fixed yet.
    pub fn compute_pnl(&self, price: f64) -> f64 {
        let entry = match self.entry_price {
            Some(e) if e > 0.0 => e,
            _ => return 0.0,
        };

        let delta = match self.direction {
            Direction::Buy => price - entry,
            Direction::Sell => entry - price,
        };

        round_cash(delta / entry * self.amount)
    }

    /// Whether a pending limit/stop order fires at the given price.
    ///
    /// limit buy: price <= trigger; limit sell: price >= trigger;
    /// stop buy: price >= trigger; stop sell: price <= trigger.
    pub fn should_trigger(&self, price: f64) -> bool {
        match (&self.order, self.direction) {
            (OrderKind::Limit { trigger_price }, Direction::Buy) => price <= *trigger_price,
            (OrderKind::Limit { trigger_price }, Direction::Sell) => price >= *trigger_price,
            (OrderKind::Stop { trigger_price }, Direction::Buy) => price >= *trigger_price,
            (OrderKind::Stop { trigger_price }, Direction::Sell) => price <= *trigger_price,
            (OrderKind::Market, _) => false,
        }
    }

    /// Refresh the mark-to-market fields against the given price.
    pub fn mark_to_market(&mut self, price: f64) {
        self.current_price = Some(price);
        self.unrealized_pnl = self.compute_pnl(price);
    }

    /// Whether the stop-loss bound is hit at the given price.
    pub fn stop_loss_hit(&self, price: f64) -> bool {
        match self.stop_loss {
            Some(sl) => match self.direction {
                Direction::Buy => price <= sl,
                Direction::Sell => price >= sl,
            },
            None => false,
        }
    }

    /// Whether the take-profit bound is hit at the given price.
    pub fn take_profit_hit(&self, price: f64) -> bool {
        match self.take_profit {
            Some(tp) => match self.direction {
                Direction::Buy => price >= tp,
                Direction::Sell => price <= tp,
            },
            None => false,
        }
    }
}
