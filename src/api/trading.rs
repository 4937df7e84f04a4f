//! User-facing trading endpoints.
//!
//! Money crosses the API boundary as fixed-point decimal strings: cash
//! fields with two decimals, prices and volumes with eight.

use crate::api::AppState;
use crate::error::AppError;
use crate::services::{OpenPositionRequest, UserContact};
use crate::types::money::{cash_str, price_str};
use crate::types::{Portfolio, Position};
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/positions", post(open_position))
        .route("/api/positions/:id", get(get_position))
        .route("/api/positions/:id/close", post(close_position))
        .route("/api/positions/:id/cancel", post(cancel_position))
        .route("/api/users/:user_id/positions", get(list_positions))
        .route("/api/users/:user_id/portfolio", get(get_portfolio))
        .route("/api/users/:user_id/contact", put(put_contact))
        .route("/api/prices", get(list_prices))
}

/// Position as rendered to API clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    pub opened_by_admin: bool,
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub direction: String,
    pub order_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<String>,
    pub volume: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<String>,
    pub unrealized_pnl: String,
    pub admin_profit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl From<Position> for PositionView {
    fn from(pos: Position) -> Self {
        Self {
            id: pos.id,
            user_id: pos.user_id,
            admin_id: pos.admin_id,
            opened_by_admin: pos.opened_by_admin,
            symbol: pos.symbol,
            name: pos.name,
            asset_type: pos.asset_type.to_string(),
            direction: pos.direction.to_string(),
            order_type: pos.order.kind_str().to_string(),
            trigger_price: pos.order.trigger_price().map(price_str),
            volume: price_str(pos.volume),
            amount: cash_str(pos.amount),
            entry_price: pos.entry_price.map(price_str),
            current_price: pos.current_price.map(price_str),
            stop_loss: pos.stop_loss.map(price_str),
            take_profit: pos.take_profit.map(price_str),
            unrealized_pnl: cash_str(pos.unrealized_pnl),
            admin_profit: cash_str(pos.admin_profit),
            realized_pnl: pos.realized_pnl.map(cash_str),
            status: pos.status.to_string(),
            close_reason: pos.close_reason.map(|r| r.to_string()),
            created_at: pos.created_at,
            opened_at: pos.opened_at,
            closed_at: pos.closed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub user_id: String,
    pub balance: String,
    pub total_profit: String,
    pub total_profit_percent: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Portfolio> for PortfolioView {
    fn from(p: Portfolio) -> Self {
        Self {
            user_id: p.user_id,
            balance: cash_str(p.balance),
            total_profit: cash_str(p.total_profit),
            total_profit_percent: format!("{:.2}", p.total_profit_percent),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

async fn open_position(
    State(state): State<AppState>,
    Json(req): Json<OpenPositionRequest>,
) -> Result<Json<PositionView>, AppError> {
    if req.amount <= 0.0 {
        return Err(AppError::bad_request("amount must be positive"));
    }
    let position = state.engine.open_position(req)?;
    Ok(Json(position.into()))
}

async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PositionView>, AppError> {
    let position = state.engine.get_position(&id)?;
    Ok(Json(position.into()))
}

async fn close_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PositionView>, AppError> {
    let position = state.engine.manual_close(&id)?;
    Ok(Json(position.into()))
}

async fn cancel_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PositionView>, AppError> {
    let position = state.engine.cancel_pending(&id)?;
    Ok(Json(position.into()))
}

async fn list_positions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PositionView>>, AppError> {
    let positions = state.engine.list_user_positions(&user_id)?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PortfolioView>, AppError> {
    let portfolio = state.engine.get_portfolio(&user_id)?;
    Ok(Json(portfolio.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactRequest {
    email: String,
    first_name: String,
}

async fn put_contact(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<UserContact>, AppError> {
    let contact = UserContact {
        user_id,
        email: req.email,
        first_name: req.first_name,
    };
    state
        .store
        .upsert_user_contact(&contact)
        .map_err(|err| AppError::from(crate::services::TradingError::from(err)))?;
    Ok(Json(contact))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceView {
    symbol: String,
    price: String,
    updated_at: i64,
}

async fn list_prices(State(state): State<AppState>) -> Json<Vec<PriceView>> {
    let mut prices: Vec<PriceView> = state
        .prices
        .all_prices()
        .into_iter()
        .map(|p| PriceView {
            symbol: p.symbol,
            price: price_str(p.price),
            updated_at: p.updated_at,
        })
        .collect();
    prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Json(prices)
}
