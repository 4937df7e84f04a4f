//! Email Sink
//!
//! Trade-closed notifications. The sink is a trait so the engine can be
//! tested without a mail transport; the default implementation just
//! logs the rendered summary. Delivery is best effort and never fails a
//! settlement.

use serde::Serialize;
use tracing::info;

/// Summary rendered into the trade-closed email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeClosedEmail {
    pub position_id: String,
    pub symbol: String,
    pub direction: String,
    /// Units of the instrument, 8dp string
    pub volume: String,
    /// Committed margin, 2dp string
    pub amount: String,
    /// Entry price, 8dp string
    pub entry_price: String,
    /// Close price, 8dp string
    pub close_price: String,
    /// Realized P&L, signed 2dp string
    pub realized_pnl: String,
    pub close_reason: String,
}

pub trait EmailSink: Send + Sync {
    fn send_trade_closed(&self, to_email: &str, first_name: &str, summary: &TradeClosedEmail);
}

/// Sink that writes the notification to the log instead of a mailbox.
pub struct LogEmailSink;

impl EmailSink for LogEmailSink {
    fn send_trade_closed(&self, to_email: &str, first_name: &str, summary: &TradeClosedEmail) {
        info!(
            to = to_email,
            first_name,
            position_id = %summary.position_id,
            symbol = %summary.symbol,
            pnl = %summary.realized_pnl,
            reason = %summary.close_reason,
            "trade closed notification"
        );
    }
}
