// Routes module - wires every HTTP endpoint to its handler

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::handlers::*;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))

        // ===== ACCOUNT ENDPOINTS =====
        .route("/users", post(open_account))
        .route("/users/:id/balance", get(get_balance))
        .route("/users/:id/deposit", post(deposit))
        .route("/users/:id/wagers", get(get_user_wagers))

        // ===== BET ENDPOINTS =====
        .route("/bets", get(list_bets).post(create_bet))
        .route("/bets/:id", get(get_bet))
        .route("/bets/:id/wagers", get(get_bet_wagers).post(place_wager))
        .route("/bets/:id/lock", post(lock_bet))
        .route("/bets/:id/dispute", post(dispute_bet))
        .route("/bets/:id/settle", post(settle_bet))

        // ===== FIRE BACK ENDPOINTS =====
        .route("/bets/:id/fire-back", post(fire_back))
        .route("/bets/:id/fire-backs", get(list_fire_backs))
        .route("/fire-backs/:id/respond", post(respond_to_fire_back))

        // ===== ACTIVITY =====
        .route("/activity", get(get_activity))

        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
