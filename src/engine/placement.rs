//! Wager placement.
//!
//! Debit, pool update, status transition and the stake record form one transaction per
//! bet: all of it runs under the bet's lock, the pool and status changes are staged on a
//! working copy, and the copy is committed only once the stake record is stored. A failure
//! after the debit refunds it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::WagerEngine;
use crate::error::{WagerError, WagerResult};
use crate::market::{effective_status, evaluate_opening, new_id, Bet, BetStatus, PlacedBet, WagerPool};
use crate::money::{out_of_range, round2, validate_amount};
use crate::store::lock;

/// What a successful stake hands back: the record and the market right after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReceipt {
    pub placed_bet: PlacedBet,
    pub status: BetStatus,
    pub odds: BTreeMap<String, Decimal>,
    pub total_pool: Decimal,
}

impl WagerEngine {
    pub fn place_bet(
        &self,
        bet_id: &str,
        user_id: &str,
        option_key: &str,
        amount: Decimal,
    ) -> WagerResult<PlacementReceipt> {
        let handle = self.bet_handle(bet_id)?;
        let mut bet = lock(&handle);
        self.persist_lazy_close(&mut bet);

        let now = self.clock.now();
        let placed_bet = self.stake_locked(&mut bet, user_id, option_key, amount, now)?;

        Ok(PlacementReceipt {
            placed_bet,
            status: bet.status,
            odds: bet.odds_snapshot(),
            total_pool: bet.total_pool(),
        })
    }

    /// Place a stake on a bet whose lock the caller holds (or which nobody else can see yet).
    pub(super) fn stake_locked(
        &self,
        bet: &mut Bet,
        user_id: &str,
        option_key: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> WagerResult<PlacedBet> {
        if !bet.options.contains_key(option_key) {
            return Err(WagerError::OptionNotFound {
                bet_id: bet.id.clone(),
                option_key: option_key.to_string(),
            });
        }
        validate_amount(amount)?;

        let status = effective_status(bet, now);
        if !status.accepts_wagers() || bet.settling {
            return Err(WagerError::BetNotAcceptingWagers { bet_id: bet.id.clone(), status });
        }
        if !bet.admits(user_id) {
            return Err(WagerError::NotAuthorized(format!("{} was not challenged on bet {}", user_id, bet.id)));
        }
        if let Some(minimum) = bet.minimum_wager {
            if amount < minimum {
                return Err(WagerError::BelowMinimumWager { minimum, offered: amount });
            }
        }
        let owes_floor = user_id == bet.creator_id && bet.creator_floor.is_some();
        if let Some(floor) = bet.creator_floor.filter(|_| owes_floor) {
            if amount < floor {
                return Err(WagerError::BelowMinimumWager { minimum: floor, offered: amount });
            }
        }

        self.ledger.debit(user_id, amount)?;

        let refund_reference = format!("{}:{}", bet.id, option_key);
        let refund_and_fail = |e: WagerError| -> WagerResult<PlacedBet> {
            warn!("⚠️  Stake by {} on {} failed after debit, refunding: {}", user_id, refund_reference, e);
            self.ledger.refund(user_id, amount, &refund_reference)?;
            Err(e)
        };

        // Stage the pool update and status change; commit after the record lands.
        let mut next = bet.clone();
        let odds = match WagerPool::new(&mut next.options, &self.odds).record_stake(option_key, amount) {
            Ok(odds) => odds,
            Err(e) => return refund_and_fail(e),
        };
        let potential_winnings = match amount.checked_mul(odds) {
            Some(winnings) => round2(winnings),
            None => return refund_and_fail(out_of_range("potential winnings")),
        };
        let opened = evaluate_opening(&mut next);
        if owes_floor {
            next.creator_floor = None;
        }

        let placed = PlacedBet {
            id: new_id("stake"),
            user_id: user_id.to_string(),
            bet_id: bet.id.clone(),
            selected_option: option_key.to_string(),
            amount,
            odds,
            placed_at: now,
            potential_winnings,
            is_partial: status == BetStatus::Bid,
        };

        if let Err(e) = self.bets.append_placed_bet(placed.clone()) {
            warn!("⚠️  Stake {} not recorded, refunding {}: {}", placed.id, user_id, e);
            self.ledger.refund(user_id, amount, &placed.id)?;
            return Err(e);
        }
        *bet = next;

        debug!("🎯 Odds on {} now {:?}", bet.id, bet.odds_snapshot());
        self.log(
            "🎯",
            "stake",
            Some(&bet.id),
            format!(
                "{} staked {} on '{}' at {} (to win {})",
                user_id, amount, option_key, odds, placed.potential_winnings
            ),
        );
        if owes_floor {
            self.log("🔥", "fire_back_covered", Some(&bet.id), format!("{} covered the Fire Back with {}", user_id, amount));
        }
        if opened {
            self.log("🟢", "bet_open", Some(&bet.id), "every option is backed (bid -> open)".to_string());
        }
        Ok(placed)
    }
}
