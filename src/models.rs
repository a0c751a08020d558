// Request and response bodies for the HTTP API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub user_id: String,
    #[serde(default)]
    pub starting_balance: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    pub user_id: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceWagerRequest {
    pub user_id: String,
    pub option_key: String,
    pub amount: Decimal,
}

/// Who is acting, for lock/dispute. Authentication is left to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireBackRequest {
    pub challenger_id: String,
    pub new_wager: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondFireBackRequest {
    pub user_id: String,
    pub accept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    pub winning_option: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: String,
    pub error: String,
}
