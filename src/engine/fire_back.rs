//! Fire Back: a challenger dares the bet creator to match a bigger stake or back down.
//!
//! A Fire Back is an offer, not a stake. No money moves when it is made or answered;
//! matching only raises the floor the creator's next stake must reach.

use rust_decimal::Decimal;
use tracing::warn;

use super::WagerEngine;
use crate::error::{WagerError, WagerResult};
use crate::market::{new_id, BetStatus, FireBack, FireBackStatus};
use crate::money::validate_amount;
use crate::store::lock;

impl WagerEngine {
    pub fn fire_back(&self, bet_id: &str, challenger_id: &str, new_wager: Decimal) -> WagerResult<FireBack> {
        validate_amount(new_wager)?;
        let handle = self.bet_handle(bet_id)?;
        let bet = {
            let mut bet = lock(&handle);
            self.persist_lazy_close(&mut bet);
            bet
        };

        if bet.status != BetStatus::Open || bet.settling {
            return Err(WagerError::BetNotAcceptingWagers { bet_id: bet_id.to_string(), status: bet.status });
        }
        if challenger_id == bet.creator_id {
            return Err(WagerError::NotAuthorized(format!("{} cannot fire back at their own bet", challenger_id)));
        }
        if !bet.admits(challenger_id) {
            return Err(WagerError::NotAuthorized(format!("{} was not challenged on bet {}", challenger_id, bet_id)));
        }

        // Checked, never debited: the challenger must be able to back the offer.
        let available = self.ledger.balance(challenger_id)?;
        if available < new_wager {
            return Err(WagerError::InsufficientFunds { available, requested: new_wager });
        }

        let creator_stake = self.creator_stake(bet_id, &bet.creator_id);
        let required = bet.creator_floor.map_or(creator_stake, |floor| floor.max(creator_stake));
        if new_wager <= required {
            return Err(WagerError::FireBackTooLow { required, offered: new_wager });
        }

        let already_pending = self
            .bets
            .fire_backs_for_bet(bet_id)
            .iter()
            .any(|f| f.user_id == challenger_id && f.status == FireBackStatus::Pending);
        if already_pending {
            return Err(WagerError::DuplicateFireBack {
                bet_id: bet_id.to_string(),
                challenger_id: challenger_id.to_string(),
            });
        }

        let fire_back = FireBack {
            id: new_id("fb"),
            user_id: challenger_id.to_string(),
            bet_id: bet_id.to_string(),
            challenged_id: bet.creator_id.clone(),
            new_wager,
            status: FireBackStatus::Pending,
            created_at: self.clock.now(),
            responded_at: None,
        };
        self.bets.insert_fire_back(fire_back.clone())?;

        self.log(
            "🔥",
            "fire_back",
            Some(bet_id),
            format!(
                "{} fired back at {}: match {} or back down (current stake {})",
                challenger_id, bet.creator_id, new_wager, creator_stake
            ),
        );
        Ok(fire_back)
    }

    /// Only the challenged party may answer, and only once.
    pub fn respond_to_fire_back(&self, fire_back_id: &str, responder_id: &str, accept: bool) -> WagerResult<FireBack> {
        let fb_handle = self
            .bets
            .fire_back(fire_back_id)
            .ok_or_else(|| WagerError::FireBackNotFound(fire_back_id.to_string()))?;
        let bet_id = lock(&fb_handle).bet_id.clone();

        // Lock order: bet, then Fire Back.
        let bet_handle = self.bet_handle(&bet_id)?;
        let mut bet = lock(&bet_handle);
        let mut fire_back = lock(&fb_handle);

        if responder_id != fire_back.challenged_id {
            return Err(WagerError::NotAuthorized(format!(
                "only {} can answer Fire Back {}",
                fire_back.challenged_id, fire_back_id
            )));
        }
        if fire_back.status.is_terminal() {
            return Err(WagerError::FireBackAlreadyResolved(fire_back_id.to_string()));
        }

        let now = self.clock.now();
        fire_back.responded_at = Some(now);
        if accept {
            fire_back.status = FireBackStatus::Matched;
            let floor = bet.creator_floor.map_or(fire_back.new_wager, |f| f.max(fire_back.new_wager));
            bet.creator_floor = Some(floor);
            self.log(
                "🤝",
                "fire_back_matched",
                Some(&bet_id),
                format!(
                    "{} matched {}'s Fire Back; next stake must be at least {}",
                    responder_id, fire_back.user_id, floor
                ),
            );
        } else {
            fire_back.status = FireBackStatus::Declined;
            warn!("🏳️ {} backed down on bet {}", responder_id, bet_id);
            self.log(
                "🏳️",
                "backed_down",
                Some(&bet_id),
                format!("{} backed down from {}'s Fire Back of {}", responder_id, fire_back.user_id, fire_back.new_wager),
            );
        }
        Ok(fire_back.clone())
    }

    pub fn list_fire_backs(&self, bet_id: &str) -> WagerResult<Vec<FireBack>> {
        self.bet_handle(bet_id)?;
        Ok(self.bets.fire_backs_for_bet(bet_id))
    }

    fn creator_stake(&self, bet_id: &str, creator_id: &str) -> Decimal {
        self.bets
            .placed_bets_for_bet(bet_id)
            .iter()
            .filter(|p| p.user_id == creator_id)
            .map(|p| p.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
