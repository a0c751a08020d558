//! Settlement: fix the winning option and pay winners their locked-in winnings.
//!
//! The bet lock is held only to claim the settlement and to mark it settled. Payouts in
//! between run on per-user ledger locks, each keyed by a payout reference, so a retry
//! after a failed pass pays only what is still owed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::WagerEngine;
use crate::error::{WagerError, WagerResult};
use crate::ledger::payout_reference;
use crate::market::{transition, BetStatus};
use crate::store::lock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub bet_id: String,
    pub winning_option: String,
    /// Winners only, summed per user
    pub payouts: BTreeMap<String, Decimal>,
    pub total_paid: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl WagerEngine {
    pub fn settle(&self, bet_id: &str, winning_option: &str) -> WagerResult<SettlementReport> {
        let handle = self.bet_handle(bet_id)?;

        // Claim
        {
            let mut bet = lock(&handle);
            self.persist_lazy_close(&mut bet);

            if bet.status == BetStatus::Settled || bet.settling {
                return Err(WagerError::AlreadySettled(bet_id.to_string()));
            }
            if !bet.status.is_settleable() {
                return Err(WagerError::InvalidTransition { from: bet.status, to: BetStatus::Settled });
            }
            if !bet.options.contains_key(winning_option) {
                return Err(WagerError::InvalidWinningOption {
                    bet_id: bet_id.to_string(),
                    option_key: winning_option.to_string(),
                });
            }
            bet.settling = true;
        }

        // Pay
        let mut payouts: BTreeMap<String, Decimal> = BTreeMap::new();
        let winners = self
            .bets
            .placed_bets_for_bet(bet_id)
            .into_iter()
            .filter(|p| p.selected_option == winning_option);
        for placed in winners {
            let reference = payout_reference(bet_id, &placed.id);
            match self.ledger.credit_once(&placed.user_id, placed.potential_winnings, &reference) {
                Ok(applied) => {
                    if !applied {
                        info!("🔁 Stake {} on {} was already paid, skipping", placed.id, bet_id);
                    }
                    let owed = payouts.entry(placed.user_id.clone()).or_insert(Decimal::ZERO);
                    *owed = owed.saturating_add(placed.potential_winnings);
                }
                Err(e) => {
                    warn!("❌ Payout of stake {} on {} failed, settlement released: {}", placed.id, bet_id, e);
                    lock(&handle).settling = false;
                    return Err(e);
                }
            }
        }

        // Mark
        let settled_at = self.clock.now();
        {
            let mut bet = lock(&handle);
            bet.settling = false;
            transition(&mut bet, BetStatus::Settled)?;
            bet.winning_option = Some(winning_option.to_string());
            bet.settled_at = Some(settled_at);
        }

        let total_paid = payouts.values().copied().fold(Decimal::ZERO, Decimal::saturating_add);
        self.log(
            "✅",
            "bet_settled",
            Some(bet_id),
            format!("'{}' wins; paid {} to {} winner(s)", winning_option, total_paid, payouts.len()),
        );
        Ok(SettlementReport {
            bet_id: bet_id.to_string(),
            winning_option: winning_option.to_string(),
            payouts,
            total_paid,
            settled_at,
        })
    }
}
