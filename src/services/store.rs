//! SQLite Store
//!
//! Single-connection persistence behind a mutex. Every state machine
//! transition that has to survive a race (pending -> open, open ->
//! closing -> closed, pending -> cancelled) is a conditional UPDATE
//! keyed on the expected status; callers learn from the affected-row
//! count whether they won the transition.

use crate::types::{
    AssetType, CloseReason, Direction, OrderKind, OutcomeQuota, Portfolio, Position,
    PositionStatus, SlTpMode,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Everything recorded when an open position settles.
#[derive(Debug, Clone)]
pub struct CloseRecord {
    pub close_price: f64,
    pub realized_pnl: f64,
    pub close_reason: CloseReason,
    pub closed_at: i64,
}

/// Contact details used by the email sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS positions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                admin_id        TEXT,
                opened_by_admin INTEGER NOT NULL DEFAULT 0,
                symbol          TEXT NOT NULL,
                name            TEXT NOT NULL,
                asset_type      TEXT NOT NULL,
                direction       TEXT NOT NULL,
                order_type      TEXT NOT NULL,
                trigger_price   REAL,
                volume          REAL NOT NULL,
                amount          REAL NOT NULL,
                entry_price     REAL,
                current_price   REAL,
                stop_loss       REAL,
                take_profit     REAL,
                unrealized_pnl  REAL NOT NULL DEFAULT 0,
                admin_profit    REAL NOT NULL DEFAULT 0,
                realized_pnl    REAL,
                status          TEXT NOT NULL,
                close_reason    TEXT,
                created_at      INTEGER NOT NULL,
                opened_at       INTEGER,
                closed_at       INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_positions_status ON positions(status);
            CREATE INDEX IF NOT EXISTS idx_positions_user ON positions(user_id);

            CREATE TABLE IF NOT EXISTS portfolios (
                user_id              TEXT PRIMARY KEY,
                balance              REAL NOT NULL,
                total_profit         REAL NOT NULL DEFAULT 0,
                total_profit_percent REAL NOT NULL DEFAULT 0,
                created_at           INTEGER NOT NULL,
                updated_at           INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS outcome_quota (
                id             INTEGER PRIMARY KEY CHECK (id = 1),
                total_trades   INTEGER NOT NULL,
                win_trades     INTEGER NOT NULL,
                loss_trades    INTEGER NOT NULL,
                current_wins   INTEGER NOT NULL DEFAULT 0,
                current_losses INTEGER NOT NULL DEFAULT 0,
                sl_tp_mode     TEXT NOT NULL,
                active         INTEGER NOT NULL DEFAULT 0
            );
            INSERT OR IGNORE INTO outcome_quota
                (id, total_trades, win_trades, loss_trades, current_wins, current_losses, sl_tp_mode, active)
                VALUES (1, 10, 3, 7, 0, 0, 'natural_priority', 0);

            CREATE TABLE IF NOT EXISTS users (
                user_id    TEXT PRIMARY KEY,
                email      TEXT NOT NULL,
                first_name TEXT NOT NULL
            );",
        )
    }

    // ---- positions ----

    pub fn create_position(&self, pos: &Position) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO positions (
                id, user_id, admin_id, opened_by_admin, symbol, name, asset_type,
                direction, order_type, trigger_price, volume, amount, entry_price,
                current_price, stop_loss, take_profit, unrealized_pnl, admin_profit,
                realized_pnl, status, close_reason, created_at, opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                pos.id,
                pos.user_id,
                pos.admin_id,
                pos.opened_by_admin as i64,
                pos.symbol,
                pos.name,
                pos.asset_type.to_string(),
                pos.direction.to_string(),
                pos.order.kind_str(),
                pos.order.trigger_price(),
                pos.volume,
                pos.amount,
                pos.entry_price,
                pos.current_price,
                pos.stop_loss,
                pos.take_profit,
                pos.unrealized_pnl,
                pos.admin_profit,
                pos.realized_pnl,
                pos.status.as_str(),
                pos.close_reason.map(|r| r.as_str()),
                pos.created_at,
                pos.opened_at,
                pos.closed_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_position(&self, id: &str) -> Result<Option<Position>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM positions WHERE id = ?1",
            params![id],
            parse_position,
        )
        .optional()
    }

    pub fn list_by_status(
        &self,
        status: PositionStatus,
    ) -> Result<Vec<Position>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM positions WHERE status = ?1 ORDER BY created_at ASC")?;
        let rows = stmt.query_map(params![status.as_str()], parse_position)?;
        rows.collect()
    }

    pub fn list_user_positions(&self, user_id: &str) -> Result<Vec<Position>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM positions WHERE user_id = ?1 ORDER BY created_at DESC")?;
        let rows = stmt.query_map(params![user_id], parse_position)?;
        rows.collect()
    }

    /// Refresh the mark-to-market fields of an open position.
    pub fn update_mark(
        &self,
        id: &str,
        current_price: f64,
        unrealized_pnl: f64,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE positions SET current_price = ?1, unrealized_pnl = ?2
             WHERE id = ?3 AND status = 'open'",
            params![current_price, unrealized_pnl, id],
        )?;
        Ok(())
    }

    /// Promote a pending order to an open position. Returns false when
    /// the position was no longer pending (cancelled, or another matcher
    /// pass got there first).
    pub fn open_pending(
        &self,
        id: &str,
        entry_price: f64,
        now: i64,
    ) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET status = 'open', entry_price = ?1, current_price = ?1,
                    opened_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![entry_price, now, id],
        )?;
        Ok(changed == 1)
    }

    /// Claim an open position for settlement. Returns false when the
    /// position was not open anymore; the loser must not settle. The
    /// claim is released by `finish_close` or `revert_close`.
    pub fn begin_close(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET status = 'closing' WHERE id = ?1 AND status = 'open'",
            params![id],
        )?;
        Ok(changed == 1)
    }

    /// Finalize a claimed settlement.
    pub fn finish_close(&self, id: &str, record: &CloseRecord) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET status = 'closed', current_price = ?1, realized_pnl = ?2,
                    unrealized_pnl = ?2, close_reason = ?3, closed_at = ?4
             WHERE id = ?5 AND status = 'closing'",
            params![
                record.close_price,
                record.realized_pnl,
                record.close_reason.as_str(),
                record.closed_at,
                id
            ],
        )?;
        Ok(changed == 1)
    }

    /// Hand a claimed position back to the open state after a failed
    /// settlement decision.
    pub fn revert_close(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET status = 'open' WHERE id = ?1 AND status = 'closing'",
            params![id],
        )?;
        Ok(changed == 1)
    }

    /// Cancel a pending order. Returns false when it already left the
    /// pending state.
    pub fn cancel_pending(&self, id: &str, now: i64) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET status = 'cancelled', close_reason = 'cancelled', closed_at = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![now, id],
        )?;
        Ok(changed == 1)
    }

    pub fn set_admin_profit(&self, id: &str, profit: f64) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE positions SET admin_profit = ?1 WHERE id = ?2 AND status = 'open'",
            params![profit, id],
        )?;
        Ok(changed == 1)
    }

    // ---- portfolios ----

    pub fn get_portfolio(&self, user_id: &str) -> Result<Option<Portfolio>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id, balance, total_profit, total_profit_percent, created_at, updated_at
             FROM portfolios WHERE user_id = ?1",
            params![user_id],
            parse_portfolio,
        )
        .optional()
    }

    pub fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO portfolios (user_id, balance, total_profit, total_profit_percent, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                portfolio.user_id,
                portfolio.balance,
                portfolio.total_profit,
                portfolio.total_profit_percent,
                portfolio.created_at,
                portfolio.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn set_balance_and_profit(
        &self,
        user_id: &str,
        balance: f64,
        total_profit: f64,
        total_profit_percent: f64,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE portfolios SET balance = ?1, total_profit = ?2, total_profit_percent = ?3,
                    updated_at = ?4
             WHERE user_id = ?5",
            params![balance, total_profit, total_profit_percent, now, user_id],
        )?;
        Ok(())
    }

    // ---- outcome quota ----

    pub fn get_outcome_quota(&self) -> Result<OutcomeQuota, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT total_trades, win_trades, loss_trades, current_wins, current_losses,
                    sl_tp_mode, active
             FROM outcome_quota WHERE id = 1",
            [],
            parse_quota,
        )
    }

    pub fn update_outcome_quota(&self, quota: &OutcomeQuota) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE outcome_quota SET total_trades = ?1, win_trades = ?2, loss_trades = ?3,
                    current_wins = ?4, current_losses = ?5, sl_tp_mode = ?6, active = ?7
             WHERE id = 1",
            params![
                quota.total_trades,
                quota.win_trades,
                quota.loss_trades,
                quota.current_wins,
                quota.current_losses,
                quota.sl_tp_mode.as_str(),
                quota.active as i64
            ],
        )?;
        Ok(())
    }

    pub fn set_outcome_counters(&self, wins: i64, losses: i64) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE outcome_quota SET current_wins = ?1, current_losses = ?2 WHERE id = 1",
            params![wins, losses],
        )?;
        Ok(())
    }

    // ---- users ----

    pub fn upsert_user_contact(&self, contact: &UserContact) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (user_id, email, first_name) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET email = ?2, first_name = ?3",
            params![contact.user_id, contact.email, contact.first_name],
        )?;
        Ok(())
    }

    pub fn get_user_contact(&self, user_id: &str) -> Result<Option<UserContact>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id, email, first_name FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserContact {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    first_name: row.get(2)?,
                })
            },
        )
        .optional()
    }
}

fn parse_position(row: &Row) -> rusqlite::Result<Position> {
    let asset_type: String = row.get("asset_type")?;
    let direction: String = row.get("direction")?;
    let order_type: String = row.get("order_type")?;
    let trigger_price: Option<f64> = row.get("trigger_price")?;
    let status: String = row.get("status")?;
    let close_reason: Option<String> = row.get("close_reason")?;
    let opened_by_admin: i64 = row.get("opened_by_admin")?;

    Ok(Position {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        admin_id: row.get("admin_id")?,
        opened_by_admin: opened_by_admin != 0,
        symbol: row.get("symbol")?,
        name: row.get("name")?,
        asset_type: parse_asset_type(&asset_type),
        direction: parse_direction(&direction),
        order: parse_order(&order_type, trigger_price),
        volume: row.get("volume")?,
        amount: row.get("amount")?,
        entry_price: row.get("entry_price")?,
        current_price: row.get("current_price")?,
        stop_loss: row.get("stop_loss")?,
        take_profit: row.get("take_profit")?,
        unrealized_pnl: row.get("unrealized_pnl")?,
        admin_profit: row.get("admin_profit")?,
        realized_pnl: row.get("realized_pnl")?,
        status: parse_status(&status),
        close_reason: close_reason.as_deref().map(parse_close_reason),
        created_at: row.get("created_at")?,
        opened_at: row.get("opened_at")?,
        closed_at: row.get("closed_at")?,
    })
}

fn parse_portfolio(row: &Row) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        user_id: row.get(0)?,
        balance: row.get(1)?,
        total_profit: row.get(2)?,
        total_profit_percent: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn parse_quota(row: &Row) -> rusqlite::Result<OutcomeQuota> {
    let mode: String = row.get(5)?;
    let active: i64 = row.get(6)?;
    Ok(OutcomeQuota {
        total_trades: row.get(0)?,
        win_trades: row.get(1)?,
        loss_trades: row.get(2)?,
        current_wins: row.get(3)?,
        current_losses: row.get(4)?,
        sl_tp_mode: parse_sl_tp_mode(&mode),
        active: active != 0,
    })
}

fn parse_asset_type(s: &str) -> AssetType {
    match s {
        "stock" => AssetType::Stock,
        "etf" => AssetType::Etf,
        "forex" => AssetType::Forex,
        _ => AssetType::Crypto,
    }
}

fn parse_direction(s: &str) -> Direction {
    match s {
        "sell" => Direction::Sell,
        _ => Direction::Buy,
    }
}

fn parse_order(kind: &str, trigger_price: Option<f64>) -> OrderKind {
    match (kind, trigger_price) {
        ("limit", Some(trigger_price)) => OrderKind::Limit { trigger_price },
        ("stop", Some(trigger_price)) => OrderKind::Stop { trigger_price },
        _ => OrderKind::Market,
    }
}

fn parse_status(s: &str) -> PositionStatus {
    match s {
        "pending" => PositionStatus::Pending,
        "closing" => PositionStatus::Closing,
        "closed" => PositionStatus::Closed,
        "cancelled" => PositionStatus::Cancelled,
        _ => PositionStatus::Open,
    }
}

fn parse_close_reason(s: &str) -> CloseReason {
    match s {
        "stop_loss" => CloseReason::StopLoss,
        "take_profit" => CloseReason::TakeProfit,
        "admin_close" => CloseReason::AdminClose,
        "cancelled" => CloseReason::Cancelled,
        _ => CloseReason::Manual,
    }
}

fn parse_sl_tp_mode(s: &str) -> SlTpMode {
    match s {
        "admin_choose" => SlTpMode::AdminChoose,
        _ => SlTpMode::NaturalPriority,
    }
}
