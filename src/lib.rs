//! trademill: a simulated leveraged-trading settlement server.
//!
//! Positions open against cached prices (market orders immediately,
//! limit/stop orders via a periodic matcher), are marked to market by a
//! monitor that enforces stop-loss and take-profit, and settle through
//! a quota-based outcome engine. Balances live in per-user portfolios;
//! lifecycle events fan out over WebSocket and email.

pub mod api;
pub mod config;
pub mod error;
pub mod push;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::AppError;
pub use push::{PushEvent, PushHub};
pub use services::{
    EmailSink, LogEmailSink, OpenPositionRequest, OutcomeEngine, PortfolioLedger, PriceCache,
    SettlementEngine, SettlementScheduler, SimulatedFeed, SqliteStore, TradingError,
};
pub use types::{
    AssetType, CloseReason, Direction, OrderKind, OutcomeQuota, Portfolio, Position,
    PositionStatus, SlTpMode,
};
