//! Monetary rounding and boundary formatting.
//!
//! Internal math runs on f64; values are rounded consistently before
//! persistence and rendered as fixed-point decimal strings at the API
//! boundary (2 decimal places for cash, 8 for prices and volumes).

/// Round a cash amount (balances, margin, P&L) to 2 decimal places.
pub fn round_cash(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a price or volume to 8 decimal places.
pub fn round_price(value: f64) -> f64 {
    (value * 100_000_000.0).round() / 100_000_000.0
}

/// Format a cash amount as a fixed-point string with 2 decimals.
pub fn cash_str(value: f64) -> String {
    format!("{:.2}", round_cash(value))
}

/// Format a price or volume as a fixed-point string with 8 decimals.
pub fn price_str(value: f64) -> String {
    format!("{:.8}", round_price(value))
}
