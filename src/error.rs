//! Error kinds surfaced by the wager engine.
//!
//! Every variant is a recoverable, user-facing condition. Callers display it and let the
//! user retry with corrected input; nothing in here is fatal to the process.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::BetStatus;

pub type WagerResult<T> = Result<T, WagerError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WagerError {
    BetNotFound(String),
    OptionNotFound { bet_id: String, option_key: String },
    BetNotAcceptingWagers { bet_id: String, status: BetStatus },
    BelowMinimumWager { minimum: Decimal, offered: Decimal },
    InsufficientFunds { available: Decimal, requested: Decimal },
    InvalidAmount(String),
    FireBackAlreadyResolved(String),
    NotAuthorized(String),
    AlreadySettled(String),
    InvalidWinningOption { bet_id: String, option_key: String },
    UserNotFound(String),
    AccountExists(String),
    FireBackNotFound(String),
    FireBackTooLow { required: Decimal, offered: Decimal },
    DuplicateFireBack { bet_id: String, challenger_id: String },
    InvalidBet(String),
    InvalidTransition { from: BetStatus, to: BetStatus },
    Storage(String),
}

impl WagerError {
    /// Stable machine-readable name, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            WagerError::BetNotFound(_) => "BetNotFound",
            WagerError::OptionNotFound { .. } => "OptionNotFound",
            WagerError::BetNotAcceptingWagers { .. } => "BetNotAcceptingWagers",
            WagerError::BelowMinimumWager { .. } => "BelowMinimumWager",
            WagerError::InsufficientFunds { .. } => "InsufficientFunds",
            WagerError::InvalidAmount(_) => "InvalidAmount",
            WagerError::FireBackAlreadyResolved(_) => "FireBackAlreadyResolved",
            WagerError::NotAuthorized(_) => "NotAuthorized",
            WagerError::AlreadySettled(_) => "AlreadySettled",
            WagerError::InvalidWinningOption { .. } => "InvalidWinningOption",
            WagerError::UserNotFound(_) => "UserNotFound",
            WagerError::AccountExists(_) => "AccountExists",
            WagerError::FireBackNotFound(_) => "FireBackNotFound",
            WagerError::FireBackTooLow { .. } => "FireBackTooLow",
            WagerError::DuplicateFireBack { .. } => "DuplicateFireBack",
            WagerError::InvalidBet(_) => "InvalidBet",
            WagerError::InvalidTransition { .. } => "InvalidTransition",
            WagerError::Storage(_) => "Storage",
        }
    }
}

impl std::fmt::Display for WagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WagerError::BetNotFound(id) => write!(f, "Bet not found: {}", id),
            WagerError::OptionNotFound { bet_id, option_key } => {
                write!(f, "Option '{}' not found on bet {}", option_key, bet_id)
            }
            WagerError::BetNotAcceptingWagers { bet_id, status } => {
                write!(f, "Bet {} is not accepting wagers (status: {})", bet_id, status)
            }
            WagerError::BelowMinimumWager { minimum, offered } => {
                write!(f, "Wager below minimum: need {}, offered {}", minimum, offered)
            }
            WagerError::InsufficientFunds { available, requested } => {
                write!(f, "Insufficient funds: have {}, need {}", available, requested)
            }
            WagerError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            WagerError::FireBackAlreadyResolved(id) => write!(f, "Fire Back already resolved: {}", id),
            WagerError::NotAuthorized(msg) => write!(f, "Not authorized: {}", msg),
            WagerError::AlreadySettled(id) => write!(f, "Bet already settled: {}", id),
            WagerError::InvalidWinningOption { bet_id, option_key } => {
                write!(f, "Invalid winning option '{}' for bet {}", option_key, bet_id)
            }
            WagerError::UserNotFound(id) => write!(f, "User not found: {}", id),
            WagerError::AccountExists(id) => write!(f, "Account already exists: {}", id),
            WagerError::FireBackNotFound(id) => write!(f, "Fire Back not found: {}", id),
            WagerError::FireBackTooLow { required, offered } => {
                write!(f, "Fire Back must exceed {}, offered {}", required, offered)
            }
            WagerError::DuplicateFireBack { bet_id, challenger_id } => write!(
                f,
                "{} already has a pending Fire Back on bet {}",
                challenger_id, bet_id
            ),
            WagerError::InvalidBet(msg) => write!(f, "Invalid bet: {}", msg),
            WagerError::InvalidTransition { from, to } => {
                write!(f, "Invalid status transition: {} -> {}", from, to)
            }
            WagerError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for WagerError {}
