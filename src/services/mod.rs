pub mod email;
pub mod feed;
pub mod ledger;
pub mod outcome;
pub mod price_cache;
pub mod scheduler;
pub mod settlement;
pub mod store;

pub use email::{EmailSink, LogEmailSink, TradeClosedEmail};
pub use feed::SimulatedFeed;
pub use ledger::PortfolioLedger;
pub use outcome::OutcomeEngine;
pub use price_cache::PriceCache;
pub use scheduler::SettlementScheduler;
pub use settlement::{OpenPositionRequest, SettlementEngine, TradingError};
pub use store::{CloseRecord, SqliteStore, UserContact};
