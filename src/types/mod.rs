pub mod money;
pub mod outcome;
pub mod portfolio;
pub mod position;

pub use outcome::{OutcomeQuota, SlTpMode};
pub use portfolio::Portfolio;
pub use position::{AssetType, CloseReason, Direction, OrderKind, Position, PositionStatus};
