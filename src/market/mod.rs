// ============================================================================
// Market Module - Bets, Options, Stakes and Fire Backs
// ============================================================================
//
// This module contains the wager domain model:
//   - pool: pari-mutuel odds for a bet's options
//   - lifecycle: bid -> open -> locked -> settled / disputed state machine
//
// ============================================================================

pub mod lifecycle;
pub mod pool;

pub use lifecycle::*;
pub use pool::*;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// BET STATUS
// ============================================================================

/// Bet lifecycle status
///
/// Flow: Bid → Open → Locked → Settled
///              ↓
///           Disputed → Settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    /// Created by the creator's stake; waiting for every option to get a backer
    Bid,
    /// Every side is backed; stakes and Fire Backs accepted
    Open,
    /// Closing time passed or the creator locked it; awaiting the outcome
    Locked,
    /// Terminal; winning option fixed and payouts made
    Settled,
    /// Outcome contested; waiting for an external arbiter to settle
    Disputed,
}

impl BetStatus {
    pub fn accepts_wagers(&self) -> bool {
        matches!(self, BetStatus::Bid | BetStatus::Open)
    }

    pub fn is_settleable(&self) -> bool {
        matches!(self, BetStatus::Locked | BetStatus::Disputed)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            BetStatus::Bid => "📥",
            BetStatus::Open => "🟢",
            BetStatus::Locked => "🔒",
            BetStatus::Settled => "✅",
            BetStatus::Disputed => "⚖️",
        }
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            BetStatus::Bid => "bid",
            BetStatus::Open => "open",
            BetStatus::Locked => "locked",
            BetStatus::Settled => "settled",
            BetStatus::Disputed => "disputed",
        };
        write!(f, "{}", status_str)
    }
}

impl Default for BetStatus {
    fn default() -> Self {
        BetStatus::Bid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    /// Only the creator and the challenged users may stake
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

// ============================================================================
// BET OPTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetOption {
    pub key: String,
    pub label: String,
    /// Cumulative money staked on this option
    pub total_wagered: Decimal,
    /// Payout multiplier in effect for new stakes
    pub odds: Decimal,
    pub initial_odds: Decimal,
}

impl BetOption {
    pub fn new(key: String, label: String, initial_odds: Decimal) -> Self {
        Self {
            key,
            label,
            total_wagered: Decimal::ZERO,
            odds: initial_odds,
            initial_odds,
        }
    }

    pub fn is_backed(&self) -> bool {
        self.total_wagered > Decimal::ZERO
    }
}

// ============================================================================
// BET
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub creator_id: String,
    pub description: String,
    pub options: BTreeMap<String, BetOption>,
    pub closing_time: DateTime<Utc>,
    pub status: BetStatus,
    /// Set iff status is Settled
    pub winning_option: Option<String>,
    pub visibility: Visibility,
    pub challenged_users: Option<Vec<String>>,
    pub minimum_wager: Option<Decimal>,
    /// Non-monetary stake riding on the outcome ("loser buys dinner")
    #[serde(default)]
    pub side_stake: Option<String>,
    /// Raised by a matched Fire Back; the creator's next stake must reach it
    #[serde(default)]
    pub creator_floor: Option<Decimal>,
    /// Claimed by an in-flight settlement
    #[serde(default)]
    pub settling: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Bet {
    /// Saturates; committed pools have always passed a checked total.
    pub fn total_pool(&self) -> Decimal {
        self.options.values().fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.total_wagered))
    }

    /// True once every side of the market has at least one backer.
    pub fn all_options_backed(&self) -> bool {
        self.options.values().all(BetOption::is_backed)
    }

    pub fn option(&self, key: &str) -> Option<&BetOption> {
        self.options.get(key)
    }

    /// Whether `user_id` may stake on this bet.
    pub fn admits(&self, user_id: &str) -> bool {
        if user_id == self.creator_id || self.visibility == Visibility::Public {
            return true;
        }
        match &self.challenged_users {
            Some(users) => users.iter().any(|u| u == user_id),
            // A private bet without a list is open to anyone holding the link
            None => true,
        }
    }

    pub fn odds_snapshot(&self) -> BTreeMap<String, Decimal> {
        self.options.iter().map(|(k, o)| (k.clone(), o.odds)).collect()
    }
}

// ============================================================================
// NEW BET REQUEST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOption {
    /// Defaults to a slug of the label
    #[serde(default)]
    pub key: Option<String>,
    pub label: String,
    pub initial_odds: Decimal,
}

impl NewOption {
    pub fn new(label: &str, initial_odds: Decimal) -> Self {
        Self { key: None, label: label.to_string(), initial_odds }
    }

    pub fn resolved_key(&self) -> String {
        match &self.key {
            Some(key) => key.trim().to_string(),
            None => slugify(&self.label),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningStake {
    pub option_key: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub creator_id: String,
    pub description: String,
    pub options: Vec<NewOption>,
    pub closing_time: DateTime<Utc>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub challenged_users: Option<Vec<String>>,
    #[serde(default)]
    pub minimum_wager: Option<Decimal>,
    #[serde(default)]
    pub side_stake: Option<String>,
    /// Creator's own first stake, placed right after creation
    #[serde(default)]
    pub opening_stake: Option<OpeningStake>,
}

// ============================================================================
// PLACED BET
// ============================================================================

/// A user's stake on one option. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBet {
    pub id: String,
    pub user_id: String,
    pub bet_id: String,
    pub selected_option: String,
    pub amount: Decimal,
    /// Odds locked in for this stake
    pub odds: Decimal,
    pub placed_at: DateTime<Utc>,
    pub potential_winnings: Decimal,
    /// Placed while the market still had an unbacked side
    pub is_partial: bool,
}

// ============================================================================
// FIRE BACK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireBackStatus {
    Pending,
    Matched,
    Declined,
}

impl FireBackStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FireBackStatus::Matched | FireBackStatus::Declined)
    }
}

impl fmt::Display for FireBackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FireBackStatus::Pending => "pending",
            FireBackStatus::Matched => "matched",
            FireBackStatus::Declined => "declined",
        };
        write!(f, "{}", s)
    }
}

/// An outstanding challenge: an offer, not a stake. No funds move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireBack {
    pub id: String,
    /// The challenger
    pub user_id: String,
    pub bet_id: String,
    /// Always the bet creator
    pub challenged_id: String,
    pub new_wager: Decimal,
    pub status: FireBackStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// "Lakers win!" -> "lakers_win"
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}
