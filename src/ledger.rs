/// Wallet Ledger
///
/// Sole owner of user wallet balances. Every mutation takes the user's own lock, so a
/// debit for one bet and a payout from another serialize per user and never globally.
///
/// KEY FEATURES:
/// - Debits never overdraw: the balance check and subtraction happen under one lock
/// - Journal of every balance change with the balance it left behind
/// - Reference-keyed credits (`credit_once`) so a re-run settlement never double-pays

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{WagerError, WagerResult};
use crate::market::new_id;
use crate::money::{out_of_range, validate_amount};
use crate::store::{lock, UserStore};

// ============================================================================
// CORE TYPES
// ============================================================================

/// A user's wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    /// Never negative
    pub wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
    /// Credit references already applied to this wallet
    #[serde(default)]
    pub applied_references: BTreeSet<String>,
}

impl Account {
    pub fn new(user_id: &str, balance: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            wallet_balance: balance,
            created_at: Utc::now(),
            applied_references: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Opening,
    Deposit,
    Debit,
    Credit,
    /// Compensates a debit whose stake could not be recorded
    Refund,
    Payout,
}

/// One balance change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub kind: EntryKind,
    pub user_id: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub accounts: usize,
    pub total_balance: Decimal,
    pub entries: usize,
    pub total_paid_out: Decimal,
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct Ledger {
    users: Arc<dyn UserStore>,
    journal: Mutex<Vec<LedgerEntry>>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, journal: Mutex::new(Vec::new()), clock }
    }

    /// Register a wallet with an opening balance
    pub fn open_account(&self, user_id: &str, starting_balance: Decimal) -> WagerResult<Decimal> {
        if user_id.trim().is_empty() {
            return Err(WagerError::UserNotFound(user_id.to_string()));
        }
        if starting_balance < Decimal::ZERO {
            return Err(WagerError::InvalidAmount(format!(
                "opening balance {} cannot be negative",
                starting_balance
            )));
        }
        let mut account = Account::new(user_id, starting_balance);
        account.created_at = self.clock.now();
        self.users.insert_account(account)?;
        self.record(EntryKind::Opening, user_id, starting_balance, starting_balance, None);

        info!("👤 Opened wallet {} with {}", user_id, starting_balance);
        Ok(starting_balance)
    }

    pub fn balance(&self, user_id: &str) -> WagerResult<Decimal> {
        let handle = self.account(user_id)?;
        let balance = lock(&handle).wallet_balance;
        Ok(balance)
    }

    /// Subtract `amount`, failing with `InsufficientFunds` rather than going negative.
    pub fn debit(&self, user_id: &str, amount: Decimal) -> WagerResult<Decimal> {
        validate_amount(amount)?;
        let handle = self.account(user_id)?;

        let balance_after = {
            let mut account = lock(&handle);
            if amount > account.wallet_balance {
                return Err(WagerError::InsufficientFunds {
                    available: account.wallet_balance,
                    requested: amount,
                });
            }
            account.wallet_balance -= amount;
            account.wallet_balance
        };

        self.record(EntryKind::Debit, user_id, amount, balance_after, None);
        debug!("💸 Debited {} from {} (now {})", amount, user_id, balance_after);
        Ok(balance_after)
    }

    pub fn credit(&self, user_id: &str, amount: Decimal) -> WagerResult<Decimal> {
        self.apply_credit(EntryKind::Credit, user_id, amount, None, false)
            .map(|(balance, _)| balance)
    }

    pub fn deposit(&self, user_id: &str, amount: Decimal) -> WagerResult<Decimal> {
        validate_amount(amount)?;
        let (balance, _) = self.apply_credit(EntryKind::Deposit, user_id, amount, None, false)?;
        info!("🏦 Deposit {} to {} (now {})", amount, user_id, balance);
        Ok(balance)
    }

    /// Return a debit whose stake never landed.
    pub fn refund(&self, user_id: &str, amount: Decimal, reference: &str) -> WagerResult<Decimal> {
        let (balance, _) = self.apply_credit(EntryKind::Refund, user_id, amount, Some(reference), false)?;
        info!("↩️  Refunded {} to {} ({})", amount, user_id, reference);
        Ok(balance)
    }

    /// Credit at most once per `reference`. Returns false if it was already applied.
    pub fn credit_once(&self, user_id: &str, amount: Decimal, reference: &str) -> WagerResult<bool> {
        self.apply_credit(EntryKind::Payout, user_id, amount, Some(reference), true)
            .map(|(_, applied)| applied)
    }

    pub fn entries_for(&self, user_id: &str) -> Vec<LedgerEntry> {
        lock(&self.journal).iter().filter(|e| e.user_id == user_id).cloned().collect()
    }

    pub fn recent_entries(&self, limit: usize) -> Vec<LedgerEntry> {
        let journal = lock(&self.journal);
        journal.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let user_ids = self.users.user_ids();
        let total_balance = user_ids
            .iter()
            .filter_map(|id| self.users.account(id))
            .map(|handle| lock(&handle).wallet_balance)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        let journal = lock(&self.journal);
        let total_paid_out = journal
            .iter()
            .filter(|e| e.kind == EntryKind::Payout)
            .map(|e| e.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add);

        LedgerStats { accounts: user_ids.len(), total_balance, entries: journal.len(), total_paid_out }
    }

    fn account(&self, user_id: &str) -> WagerResult<Arc<Mutex<Account>>> {
        self.users
            .account(user_id)
            .ok_or_else(|| WagerError::UserNotFound(user_id.to_string()))
    }

    fn apply_credit(
        &self,
        kind: EntryKind,
        user_id: &str,
        amount: Decimal,
        reference: Option<&str>,
        once: bool,
    ) -> WagerResult<(Decimal, bool)> {
        if amount < Decimal::ZERO {
            return Err(WagerError::InvalidAmount(format!("credit {} cannot be negative", amount)));
        }
        let handle = self.account(user_id)?;

        let balance_after = {
            let mut account = lock(&handle);
            if let Some(reference) = reference.filter(|_| once) {
                if !account.applied_references.insert(reference.to_string()) {
                    return Ok((account.wallet_balance, false));
                }
            }
            let Some(balance) = account.wallet_balance.checked_add(amount) else {
                if let Some(reference) = reference.filter(|_| once) {
                    account.applied_references.remove(reference);
                }
                return Err(out_of_range("wallet balance"));
            };
            account.wallet_balance = balance;
            balance
        };

        self.record(kind, user_id, amount, balance_after, reference);
        Ok((balance_after, true))
    }

    fn record(
        &self,
        kind: EntryKind,
        user_id: &str,
        amount: Decimal,
        balance_after: Decimal,
        reference: Option<&str>,
    ) {
        lock(&self.journal).push(LedgerEntry {
            id: new_id("tx"),
            kind,
            user_id: user_id.to_string(),
            amount,
            balance_after,
            reference: reference.map(str::to_string),
            timestamp: self.clock.now(),
        });
    }
}

pub fn hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Idempotency key for paying out one stake.
pub fn payout_reference(bet_id: &str, placed_bet_id: &str) -> String {
    hash(&format!("payout:{}:{}", bet_id, placed_bet_id))
}
