// HTTP API tests: drive the router in-process, no server needed.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use fireback_wagers::{router, AppState, Clock, EngineConfig, ManualClock, MemoryStore};

fn app() -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::with_store(Arc::new(MemoryStore::new()), clock.clone(), EngineConfig::default());
    (router(Arc::new(state)), clock)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        })
        .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}

async fn open(app: &Router, user: &str, balance: &str) {
    let (status, body) = call(app, "POST", "/users", Some(json!({ "user_id": user, "starting_balance": balance }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_open_account_defaults_and_conflict() {
    let (app, _) = app();

    let (status, body) = call(&app, "POST", "/users", Some(json!({ "user_id": "ALICE" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(decimal(&body["balance"]), dec!(100));

    let (status, body) = call(&app, "POST", "/users", Some(json!({ "user_id": "ALICE" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "AccountExists");

    let (status, body) = call(&app, "GET", "/users/NOBODY/balance", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_full_bet_flow_over_http() {
    let (app, clock) = app();
    open(&app, "ALICE", "100").await;
    open(&app, "BOB", "100").await;

    let closing = (clock.now() + Duration::hours(1)).to_rfc3339();
    let (status, body) = call(
        &app,
        "POST",
        "/bets",
        Some(json!({
            "creator_id": "ALICE",
            "description": "Will it snow on Friday?",
            "options": [
                { "key": "A", "label": "Snow", "initial_odds": "2.0" },
                { "key": "B", "label": "No snow", "initial_odds": "2.0" }
            ],
            "closing_time": closing,
            "visibility": "public"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["bet"]["status"], "bid");
    let bet_id = body["bet"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/bets/{}/wagers", bet_id),
        Some(json!({ "user_id": "ALICE", "option_key": "A", "amount": "20" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(decimal(&body["receipt"]["placed_bet"]["potential_winnings"]), dec!(22));
    assert_eq!(body["receipt"]["status"], "bid");

    let (_, body) = call(
        &app,
        "POST",
        &format!("/bets/{}/wagers", bet_id),
        Some(json!({ "user_id": "BOB", "option_key": "B", "amount": "10" })),
    )
    .await;
    assert_eq!(body["receipt"]["status"], "open");
    assert_eq!(decimal(&body["receipt"]["odds"]["A"]), dec!(1.43));
    assert_eq!(decimal(&body["receipt"]["odds"]["B"]), dec!(2.85));

    // Fire Back and back down
    let (status, body) = call(
        &app,
        "POST",
        &format!("/bets/{}/fire-back", bet_id),
        Some(json!({ "challenger_id": "BOB", "new_wager": "30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["fire_back"]["status"], "pending");
    let fb_id = body["fire_back"]["id"].as_str().unwrap().to_string();

    let respond_uri = format!("/fire-backs/{}/respond", fb_id);
    let (status, _) = call(&app, "POST", &respond_uri, Some(json!({ "user_id": "BOB", "accept": true }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = call(&app, "POST", &respond_uri, Some(json!({ "user_id": "ALICE", "accept": false }))).await;
    assert_eq!(body["fire_back"]["status"], "declined");

    let (status, body) = call(&app, "POST", &respond_uri, Some(json!({ "user_id": "ALICE", "accept": true }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "FireBackAlreadyResolved");

    // Settling an open bet is refused; after closing time it goes through once
    let settle_uri = format!("/bets/{}/settle", bet_id);
    let (status, _) = call(&app, "POST", &settle_uri, Some(json!({ "winning_option": "A" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    clock.advance(Duration::hours(2));
    let (status, body) = call(&app, "POST", &settle_uri, Some(json!({ "winning_option": "A" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(decimal(&body["settlement"]["payouts"]["ALICE"]), dec!(22));

    let (status, body) = call(&app, "POST", &settle_uri, Some(json!({ "winning_option": "A" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "AlreadySettled");

    let (_, body) = call(&app, "GET", "/users/ALICE/balance", None).await;
    assert_eq!(decimal(&body["balance"]), dec!(102));

    let (_, body) = call(&app, "GET", &format!("/bets/{}", bet_id), None).await;
    assert_eq!(body["bet"]["status"], "settled");
    assert_eq!(body["bet"]["winning_option"], "A");

    let (_, body) = call(&app, "GET", "/activity?limit=50", None).await;
    let lines = body["lines"].as_array().unwrap();
    assert!(lines.iter().any(|l| l.as_str().unwrap().contains("backed down")));
}

#[tokio::test]
async fn test_wager_errors_map_to_status_codes() {
    let (app, clock) = app();
    open(&app, "ALICE", "15").await;

    let closing = (clock.now() + Duration::hours(1)).to_rfc3339();
    let (_, body) = call(
        &app,
        "POST",
        "/bets",
        Some(json!({
            "creator_id": "ALICE",
            "description": "Rematch",
            "options": [
                { "label": "Me", "initial_odds": "2.0" },
                { "label": "You", "initial_odds": "2.0" }
            ],
            "closing_time": closing,
            "minimum_wager": "5"
        })),
    )
    .await;
    let bet_id = body["bet"]["id"].as_str().unwrap().to_string();
    let uri = format!("/bets/{}/wagers", bet_id);

    let (status, body) = call(&app, "POST", &uri, Some(json!({ "user_id": "ALICE", "option_key": "me", "amount": "20" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InsufficientFunds");

    let (status, body) = call(&app, "POST", &uri, Some(json!({ "user_id": "ALICE", "option_key": "me", "amount": "4" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BelowMinimumWager");

    let (status, body) = call(&app, "POST", &uri, Some(json!({ "user_id": "ALICE", "option_key": "them", "amount": "5" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "OptionNotFound");

    let (status, _) = call(&app, "GET", "/bets/bet_missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", "/bets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}
