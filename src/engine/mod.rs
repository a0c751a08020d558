// ============================================================================
// Wager Engine - entry points for creating, staking, challenging and settling
// ============================================================================
//
//   - placement: stake validation, debit, pool update, bid -> open
//   - fire_back: challenge / response protocol on an open bet
//   - settlement: winning option, payouts, idempotency guard
//
// Every entry point that writes a bet holds that bet's lock for the whole write and
// persists the lazy close first, so no path ever acts on a stale status.
// ============================================================================

pub mod fire_back;
pub mod placement;
pub mod settlement;

pub use placement::PlacementReceipt;
pub use settlement::SettlementReport;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::activity::{ActivityEntry, ActivityFeed};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{WagerError, WagerResult};
use crate::ledger::Ledger;
use crate::market::{
    effective_status, new_id, refresh_status, transition, Bet, BetOption, BetStatus, NewBet,
    OddsPolicy, PlacedBet,
};
use crate::money::validate_amount;
use crate::store::{lock, BetStore, MemoryStore, Shared, UserStore};

pub struct WagerEngine {
    bets: Arc<dyn BetStore>,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    odds: OddsPolicy,
    starting_balance: Decimal,
    activity: ActivityFeed,
}

impl WagerEngine {
    pub fn new(
        bets: Arc<dyn BetStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            bets,
            ledger: Ledger::new(users, clock.clone()),
            clock,
            odds: config.odds,
            starting_balance: config.starting_balance,
            activity: ActivityFeed::new(),
        }
    }

    /// Engine over a single in-memory store holding both bets and wallets.
    pub fn with_memory_store(store: Arc<MemoryStore>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self::new(store.clone(), store, clock, config)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn odds_policy(&self) -> &OddsPolicy {
        &self.odds
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ===== ACCOUNTS =====

    /// Open a wallet, funded with the configured starting balance unless one is given.
    pub fn open_account(&self, user_id: &str, starting_balance: Option<Decimal>) -> WagerResult<Decimal> {
        let balance = self.ledger.open_account(user_id, starting_balance.unwrap_or(self.starting_balance))?;
        self.log("👤", "account_opened", None, format!("{} joined with {}", user_id, balance));
        Ok(balance)
    }

    pub fn balance(&self, user_id: &str) -> WagerResult<Decimal> {
        self.ledger.balance(user_id)
    }

    pub fn deposit(&self, user_id: &str, amount: Decimal) -> WagerResult<Decimal> {
        self.ledger.deposit(user_id, amount)
    }

    // ===== BET CREATION =====

    /// Create a bet in `bid`. An opening stake, if given, is placed for the creator before
    /// the bet becomes visible; if it fails nothing is created.
    pub fn create_bet(&self, request: NewBet) -> WagerResult<Bet> {
        let now = self.clock.now();
        self.ledger.balance(&request.creator_id)?;

        let description = request.description.trim();
        if description.is_empty() {
            return Err(WagerError::InvalidBet("description is required".into()));
        }
        if request.options.len() < 2 {
            return Err(WagerError::InvalidBet(format!(
                "a bet needs at least 2 options, got {}",
                request.options.len()
            )));
        }
        if request.closing_time <= now {
            return Err(WagerError::InvalidBet(format!(
                "closing time {} is not in the future",
                request.closing_time.to_rfc3339()
            )));
        }
        if let Some(minimum) = request.minimum_wager {
            validate_amount(minimum)?;
        }

        let mut options = BTreeMap::new();
        for option in &request.options {
            let key = option.resolved_key();
            if key.is_empty() {
                return Err(WagerError::InvalidBet(format!("option '{}' has an empty key", option.label)));
            }
            if option.initial_odds < Decimal::ONE {
                return Err(WagerError::InvalidBet(format!(
                    "option '{}' initial odds {} must be at least 1",
                    key, option.initial_odds
                )));
            }
            let label = option.label.trim().to_string();
            if options.insert(key.clone(), BetOption::new(key.clone(), label, option.initial_odds)).is_some() {
                return Err(WagerError::InvalidBet(format!("duplicate option key '{}'", key)));
            }
        }

        let challenged_users = request.challenged_users.map(|users| {
            let mut seen = HashSet::new();
            users
                .into_iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty() && *u != request.creator_id && seen.insert(u.clone()))
                .collect::<Vec<_>>()
        });

        let mut bet = Bet {
            id: new_id("bet"),
            creator_id: request.creator_id.clone(),
            description: description.to_string(),
            options,
            closing_time: request.closing_time,
            status: BetStatus::Bid,
            winning_option: None,
            visibility: request.visibility,
            challenged_users,
            minimum_wager: request.minimum_wager,
            side_stake: request.side_stake.filter(|s| !s.trim().is_empty()),
            creator_floor: None,
            settling: false,
            created_at: now,
            settled_at: None,
        };

        let opening = match &request.opening_stake {
            Some(stake) => Some(self.stake_locked(&mut bet, &request.creator_id, &stake.option_key, stake.amount, now)?),
            None => None,
        };

        if let Err(e) = self.bets.insert_bet(bet.clone()) {
            if let Some(placed) = &opening {
                warn!("⚠️  Bet {} not stored, rolling back opening stake {}: {}", bet.id, placed.id, e);
                self.bets.remove_placed_bet(&bet.id, &placed.id);
                self.ledger.refund(&placed.user_id, placed.amount, &placed.id)?;
            }
            return Err(e);
        }

        info!("📊 Bet {} created by {} with {} options", bet.id, bet.creator_id, bet.options.len());
        self.log(
            "📊",
            "bet_created",
            Some(&bet.id),
            format!("{} opened \"{}\" (closes {})", bet.creator_id, bet.description, bet.closing_time.to_rfc3339()),
        );
        Ok(bet)
    }

    // ===== QUERIES =====

    /// Read-only snapshot with the lazy close applied.
    pub fn get_bet(&self, bet_id: &str) -> WagerResult<Bet> {
        let handle = self.bet_handle(bet_id)?;
        let mut bet = lock(&handle).clone();
        bet.status = effective_status(&bet, self.clock.now());
        Ok(bet)
    }

    pub fn list_bets(&self) -> Vec<Bet> {
        let now = self.clock.now();
        let mut bets: Vec<Bet> = self
            .bets
            .bet_ids()
            .iter()
            .filter_map(|id| self.bets.bet(id))
            .map(|handle| {
                let mut bet = lock(&handle).clone();
                bet.status = effective_status(&bet, now);
                bet
            })
            .collect();
        bets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bets
    }

    pub fn placed_bets_for_bet(&self, bet_id: &str) -> WagerResult<Vec<PlacedBet>> {
        self.bet_handle(bet_id)?;
        Ok(self.bets.placed_bets_for_bet(bet_id))
    }

    pub fn placed_bets_for_user(&self, user_id: &str) -> Vec<PlacedBet> {
        self.bets.placed_bets_for_user(user_id)
    }

    pub fn activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.recent(limit)
    }

    pub fn activity_for_bet(&self, bet_id: &str) -> Vec<ActivityEntry> {
        self.activity.for_bet(bet_id)
    }

    // ===== LIFECYCLE =====

    /// Creator closes the book early.
    pub fn lock_bet(&self, bet_id: &str, caller_id: &str) -> WagerResult<Bet> {
        let handle = self.bet_handle(bet_id)?;
        let mut bet = lock(&handle);
        self.persist_lazy_close(&mut bet);

        if caller_id != bet.creator_id {
            return Err(WagerError::NotAuthorized(format!("only {} can lock bet {}", bet.creator_id, bet_id)));
        }
        let from = transition(&mut bet, BetStatus::Locked)?;
        self.log("🔒", "bet_locked", Some(bet_id), format!("{} locked the book ({} -> locked)", caller_id, from));
        Ok(bet.clone())
    }

    /// Contest the outcome; an external arbiter settles it later.
    pub fn dispute_bet(&self, bet_id: &str, caller_id: &str) -> WagerResult<Bet> {
        let handle = self.bet_handle(bet_id)?;
        let mut bet = lock(&handle);
        self.persist_lazy_close(&mut bet);

        let participant = caller_id == bet.creator_id
            || self.bets.placed_bets_for_bet(bet_id).iter().any(|p| p.user_id == caller_id);
        if !participant {
            return Err(WagerError::NotAuthorized(format!("{} has no stake in bet {}", caller_id, bet_id)));
        }
        if bet.settling {
            return Err(WagerError::AlreadySettled(bet_id.to_string()));
        }
        let from = transition(&mut bet, BetStatus::Disputed)?;
        self.log("⚖️", "bet_disputed", Some(bet_id), format!("{} disputed the outcome ({} -> disputed)", caller_id, from));
        Ok(bet.clone())
    }

    // ===== INTERNALS =====

    fn bet_handle(&self, bet_id: &str) -> WagerResult<Shared<Bet>> {
        self.bets.bet(bet_id).ok_or_else(|| WagerError::BetNotFound(bet_id.to_string()))
    }

    /// Write the lazy close through. Caller holds the bet lock.
    fn persist_lazy_close(&self, bet: &mut Bet) {
        if let Some((from, to)) = refresh_status(bet, self.clock.now()) {
            self.log(
                to.emoji(),
                "bet_closed",
                Some(&bet.id),
                format!("closing time passed ({} -> {})", from, to),
            );
        }
    }

    fn log(&self, emoji: &str, action: &str, bet_id: Option<&str>, details: String) {
        self.activity.push(self.clock.now(), emoji, action, bet_id, details);
    }
}
