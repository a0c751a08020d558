//! Bet lifecycle state machine.
//!
//! Closing time is evaluated lazily: readers call [`effective_status`] and see a past-close
//! bet as locked, and the next writer holding the bet lock persists it via [`refresh_status`].

use chrono::{DateTime, Utc};

use super::{Bet, BetStatus};
use crate::error::{WagerError, WagerResult};

/// Status as it stands at `now`, whether or not a writer has flipped the stored flag yet.
pub fn effective_status(bet: &Bet, now: DateTime<Utc>) -> BetStatus {
    match bet.status {
        BetStatus::Bid | BetStatus::Open if now > bet.closing_time => BetStatus::Locked,
        status => status,
    }
}

/// Persist the lazy close. Returns the transition that was applied, if any.
pub fn refresh_status(bet: &mut Bet, now: DateTime<Utc>) -> Option<(BetStatus, BetStatus)> {
    let effective = effective_status(bet, now);
    if effective == bet.status {
        return None;
    }
    let from = bet.status;
    bet.status = effective;
    Some((from, effective))
}

/// `bid -> open` once every option has a backer. Returns true if the bet just opened.
pub fn evaluate_opening(bet: &mut Bet) -> bool {
    if bet.status == BetStatus::Bid && bet.all_options_backed() {
        bet.status = BetStatus::Open;
        return true;
    }
    false
}

pub fn can_transition(from: BetStatus, to: BetStatus) -> bool {
    use BetStatus::*;
    matches!(
        (from, to),
        (Bid, Open)
            | (Bid, Locked)
            | (Open, Locked)
            | (Open, Disputed)
            | (Locked, Disputed)
            | (Locked, Settled)
            | (Disputed, Settled)
    )
}

/// Explicit transition, validated against the state machine.
pub fn transition(bet: &mut Bet, to: BetStatus) -> WagerResult<BetStatus> {
    let from = bet.status;
    if from == BetStatus::Settled && to == BetStatus::Settled {
        return Err(WagerError::AlreadySettled(bet.id.clone()));
    }
    if !can_transition(from, to) {
        return Err(WagerError::InvalidTransition { from, to });
    }
    bet.status = to;
    Ok(from)
}
