// HTTP request handlers for the wager API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::app_state::SharedState;
use crate::error::WagerError;
use crate::market::NewBet;
use crate::models::*;

pub type ApiResult = Result<Json<Value>, (StatusCode, Json<ErrorResponse>)>;

pub fn status_for(err: &WagerError) -> StatusCode {
    match err {
        WagerError::BetNotFound(_)
        | WagerError::OptionNotFound { .. }
        | WagerError::UserNotFound(_)
        | WagerError::FireBackNotFound(_) => StatusCode::NOT_FOUND,
        WagerError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        WagerError::BetNotAcceptingWagers { .. }
        | WagerError::AlreadySettled(_)
        | WagerError::FireBackAlreadyResolved(_)
        | WagerError::DuplicateFireBack { .. }
        | WagerError::InvalidTransition { .. }
        | WagerError::AccountExists(_) => StatusCode::CONFLICT,
        WagerError::BelowMinimumWager { .. }
        | WagerError::InsufficientFunds { .. }
        | WagerError::InvalidAmount(_)
        | WagerError::InvalidWinningOption { .. }
        | WagerError::FireBackTooLow { .. }
        | WagerError::InvalidBet(_) => StatusCode::BAD_REQUEST,
        WagerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: WagerError) -> (StatusCode, Json<ErrorResponse>) {
    debug!("↩️  Rejected request: {}", err);
    (
        status_for(&err),
        Json(ErrorResponse { success: false, kind: err.kind().to_string(), error: err.to_string() }),
    )
}

// ===== HEALTH =====

pub async fn health_check() -> &'static str {
    "Fire Back wager engine - Online ✅"
}

// ===== ACCOUNTS =====

pub async fn open_account(
    State(state): State<SharedState>,
    Json(request): Json<OpenAccountRequest>,
) -> ApiResult {
    let balance = state
        .engine
        .open_account(&request.user_id, request.starting_balance)
        .map_err(reject)?;
    Ok(Json(json!(AccountResponse { success: true, user_id: request.user_id, balance })))
}

pub async fn get_balance(State(state): State<SharedState>, Path(user_id): Path<String>) -> ApiResult {
    let balance = state.engine.balance(&user_id).map_err(reject)?;
    Ok(Json(json!(AccountResponse { success: true, user_id, balance })))
}

pub async fn deposit(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(request): Json<DepositRequest>,
) -> ApiResult {
    let balance = state.engine.deposit(&user_id, request.amount).map_err(reject)?;
    Ok(Json(json!(AccountResponse { success: true, user_id, balance })))
}

pub async fn get_user_wagers(State(state): State<SharedState>, Path(user_id): Path<String>) -> ApiResult {
    let wagers = state.engine.placed_bets_for_user(&user_id);
    Ok(Json(json!({ "success": true, "user_id": user_id, "wagers": wagers })))
}

// ===== BETS =====

pub async fn create_bet(State(state): State<SharedState>, Json(request): Json<NewBet>) -> ApiResult {
    let bet = state.engine.create_bet(request).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet": bet })))
}

pub async fn list_bets(State(state): State<SharedState>) -> ApiResult {
    let bets = state.engine.list_bets();
    Ok(Json(json!({ "success": true, "count": bets.len(), "bets": bets })))
}

pub async fn get_bet(State(state): State<SharedState>, Path(bet_id): Path<String>) -> ApiResult {
    let bet = state.engine.get_bet(&bet_id).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet": bet, "total_pool": bet.total_pool() })))
}

pub async fn place_wager(
    State(state): State<SharedState>,
    Path(bet_id): Path<String>,
    Json(request): Json<PlaceWagerRequest>,
) -> ApiResult {
    let receipt = state
        .engine
        .place_bet(&bet_id, &request.user_id, &request.option_key, request.amount)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

pub async fn get_bet_wagers(State(state): State<SharedState>, Path(bet_id): Path<String>) -> ApiResult {
    let wagers = state.engine.placed_bets_for_bet(&bet_id).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id, "wagers": wagers })))
}

pub async fn lock_bet(
    State(state): State<SharedState>,
    Path(bet_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult {
    let bet = state.engine.lock_bet(&bet_id, &request.user_id).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet": bet })))
}

pub async fn dispute_bet(
    State(state): State<SharedState>,
    Path(bet_id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult {
    let bet = state.engine.dispute_bet(&bet_id, &request.user_id).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet": bet })))
}

pub async fn settle_bet(
    State(state): State<SharedState>,
    Path(bet_id): Path<String>,
    Json(request): Json<SettleRequest>,
) -> ApiResult {
    let report = state.engine.settle(&bet_id, &request.winning_option).map_err(reject)?;
    Ok(Json(json!({ "success": true, "settlement": report })))
}

// ===== FIRE BACK =====

pub async fn fire_back(
    State(state): State<SharedState>,
    Path(bet_id): Path<String>,
    Json(request): Json<FireBackRequest>,
) -> ApiResult {
    let fire_back = state
        .engine
        .fire_back(&bet_id, &request.challenger_id, request.new_wager)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "fire_back": fire_back })))
}

pub async fn list_fire_backs(State(state): State<SharedState>, Path(bet_id): Path<String>) -> ApiResult {
    let fire_backs = state.engine.list_fire_backs(&bet_id).map_err(reject)?;
    Ok(Json(json!({ "success": true, "bet_id": bet_id, "fire_backs": fire_backs })))
}

pub async fn respond_to_fire_back(
    State(state): State<SharedState>,
    Path(fire_back_id): Path<String>,
    Json(request): Json<RespondFireBackRequest>,
) -> ApiResult {
    let fire_back = state
        .engine
        .respond_to_fire_back(&fire_back_id, &request.user_id, request.accept)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "fire_back": fire_back })))
}

// ===== ACTIVITY =====

pub async fn get_activity(State(state): State<SharedState>, Query(query): Query<ActivityQuery>) -> ApiResult {
    let entries = state.engine.activity(query.limit.unwrap_or(100));
    let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    Ok(Json(json!({
        "success": true,
        "entries": entries,
        "lines": lines,
        "ledger": state.engine.ledger().stats(),
    })))
}
