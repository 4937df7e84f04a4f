//! Admin endpoints: opening and closing positions on behalf of users,
//! profit overlays, and the outcome quota.

use crate::api::trading::PositionView;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::{OpenPositionRequest, TradingError};
use crate::types::{CloseReason, OutcomeQuota, PositionStatus, SlTpMode};
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/positions", post(open_for_user))
        .route("/api/admin/positions/status/:status", get(list_by_status))
        .route("/api/admin/positions/:id/close", post(force_close))
        .route("/api/admin/positions/:id/profit", put(set_profit))
        .route("/api/admin/outcome", get(get_outcome).put(put_outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminOpenRequest {
    admin_id: String,
    #[serde(flatten)]
    position: OpenPositionRequest,
}

async fn open_for_user(
    State(state): State<AppState>,
    Json(req): Json<AdminOpenRequest>,
) -> Result<Json<PositionView>, AppError> {
    if req.position.amount <= 0.0 {
        return Err(AppError::bad_request("amount must be positive"));
    }
    let position = state
        .engine
        .open_position_as_admin(&req.admin_id, req.position)?;
    Ok(Json(position.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceCloseRequest {
    /// Only honored when the quota is in admin-choose mode
    #[serde(default)]
    reason: Option<CloseReason>,
}

async fn force_close(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ForceCloseRequest>>,
) -> Result<Json<PositionView>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let position = state.engine.admin_close(&id, req.reason)?;
    Ok(Json(position.into()))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<PositionStatus>,
) -> Result<Json<Vec<PositionView>>, AppError> {
    let positions = state.engine.list_positions_by_status(status)?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfitRequest {
    profit: f64,
}

async fn set_profit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ProfitRequest>,
) -> Result<Json<PositionView>, AppError> {
    let position = state.engine.set_admin_profit(&id, req.profit)?;
    Ok(Json(position.into()))
}

async fn get_outcome(State(state): State<AppState>) -> Result<Json<OutcomeQuota>, AppError> {
    let quota = state
        .store
        .get_outcome_quota()
        .map_err(|err| AppError::from(TradingError::from(err)))?;
    Ok(Json(quota))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeRequest {
    total_trades: i64,
    win_trades: i64,
    loss_trades: i64,
    sl_tp_mode: SlTpMode,
    active: bool,
    /// Restart the current cycle from zero
    #[serde(default)]
    reset_counters: bool,
}

async fn put_outcome(
    State(state): State<AppState>,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<OutcomeQuota>, AppError> {
    if req.total_trades <= 0 || req.win_trades < 0 || req.loss_trades < 0 {
        return Err(AppError::bad_request("quota counts must be non-negative"));
    }
    if req.win_trades + req.loss_trades != req.total_trades {
        return Err(AppError::bad_request(
            "winTrades + lossTrades must equal totalTrades",
        ));
    }

    let current = state
        .store
        .get_outcome_quota()
        .map_err(|err| AppError::from(TradingError::from(err)))?;

    let quota = OutcomeQuota {
        total_trades: req.total_trades,
        win_trades: req.win_trades,
        loss_trades: req.loss_trades,
        current_wins: if req.reset_counters { 0 } else { current.current_wins },
        current_losses: if req.reset_counters { 0 } else { current.current_losses },
        sl_tp_mode: req.sl_tp_mode,
        active: req.active,
    };
    state
        .store
        .update_outcome_quota(&quota)
        .map_err(|err| AppError::from(TradingError::from(err)))?;
    Ok(Json(quota))
}
