//! Entity stores behind the engine.
//!
//! Each bet, account and Fire Back sits behind its own `Mutex`, handed out as an
//! `Arc<Mutex<_>>`. Holding a bet's handle is holding that bet's update lock; the maps of
//! handles only take a short `RwLock` for lookup, so unrelated bets never contend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{WagerError, WagerResult};
use crate::ledger::Account;
use crate::market::{Bet, FireBack, PlacedBet};

pub type Shared<T> = Arc<Mutex<T>>;

pub trait BetStore: Send + Sync {
    fn insert_bet(&self, bet: Bet) -> WagerResult<Shared<Bet>>;
    fn bet(&self, bet_id: &str) -> Option<Shared<Bet>>;
    fn bet_ids(&self) -> Vec<String>;

    fn append_placed_bet(&self, placed: PlacedBet) -> WagerResult<()>;
    /// Undo a record whose bet never made it into the store.
    fn remove_placed_bet(&self, bet_id: &str, placed_bet_id: &str);
    fn placed_bets_for_bet(&self, bet_id: &str) -> Vec<PlacedBet>;
    fn placed_bets_for_user(&self, user_id: &str) -> Vec<PlacedBet>;

    fn insert_fire_back(&self, fire_back: FireBack) -> WagerResult<Shared<FireBack>>;
    fn fire_back(&self, fire_back_id: &str) -> Option<Shared<FireBack>>;
    fn fire_backs_for_bet(&self, bet_id: &str) -> Vec<FireBack>;
}

pub trait UserStore: Send + Sync {
    /// Fails with `AccountExists` if the user already has one.
    fn insert_account(&self, account: Account) -> WagerResult<Shared<Account>>;
    fn account(&self, user_id: &str) -> Option<Shared<Account>>;
    fn user_ids(&self) -> Vec<String>;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rw: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    bets: RwLock<HashMap<String, Shared<Bet>>>,
    /// Stakes per bet, in placement order
    placed_bets: RwLock<HashMap<String, Vec<PlacedBet>>>,
    fire_backs: RwLock<HashMap<String, Shared<FireBack>>>,
    /// Fire Back ids per bet for quick lookup
    fire_backs_by_bet: RwLock<HashMap<String, Vec<String>>>,
    accounts: RwLock<HashMap<String, Shared<Account>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut bets: Vec<Bet> = read(&self.bets).values().map(|b| lock(b).clone()).collect();
        bets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut placed_bets: Vec<PlacedBet> =
            read(&self.placed_bets).values().flat_map(|v| v.iter().cloned()).collect();
        placed_bets.sort_by(|a, b| a.placed_at.cmp(&b.placed_at));

        let mut fire_backs: Vec<FireBack> =
            read(&self.fire_backs).values().map(|f| lock(f).clone()).collect();
        fire_backs.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut accounts: Vec<Account> =
            read(&self.accounts).values().map(|a| lock(a).clone()).collect();
        accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        StoreSnapshot { bets, placed_bets, fire_backs, accounts }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> WagerResult<Self> {
        let store = Self::new();
        for account in snapshot.accounts {
            store.insert_account(account)?;
        }
        // A claim saved mid-settlement is released; payout references make the rerun safe.
        for mut bet in snapshot.bets {
            bet.settling = false;
            store.insert_bet(bet)?;
        }
        for placed in snapshot.placed_bets {
            store.append_placed_bet(placed)?;
        }
        for fire_back in snapshot.fire_backs {
            store.insert_fire_back(fire_back)?;
        }
        Ok(store)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> WagerResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| WagerError::Storage(format!("Failed to serialize state: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| WagerError::Storage(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }
        std::fs::write(path, json)
            .map_err(|e| WagerError::Storage(format!("Failed to write state file: {}", e)))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> WagerResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WagerError::Storage(format!("No state file found: {}", e)))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)
            .map_err(|e| WagerError::Storage(format!("Failed to deserialize state: {}", e)))?;
        Self::from_snapshot(snapshot)
    }
}

impl BetStore for MemoryStore {
    fn insert_bet(&self, bet: Bet) -> WagerResult<Shared<Bet>> {
        let mut bets = write(&self.bets);
        if bets.contains_key(&bet.id) {
            return Err(WagerError::Storage(format!("Duplicate bet id {}", bet.id)));
        }
        let id = bet.id.clone();
        let handle = Arc::new(Mutex::new(bet));
        bets.insert(id, handle.clone());
        Ok(handle)
    }

    fn bet(&self, bet_id: &str) -> Option<Shared<Bet>> {
        read(&self.bets).get(bet_id).cloned()
    }

    fn bet_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = read(&self.bets).keys().cloned().collect();
        ids.sort();
        ids
    }

    fn append_placed_bet(&self, placed: PlacedBet) -> WagerResult<()> {
        write(&self.placed_bets)
            .entry(placed.bet_id.clone())
            .or_insert_with(Vec::new)
            .push(placed);
        Ok(())
    }

    fn remove_placed_bet(&self, bet_id: &str, placed_bet_id: &str) {
        let mut placed_bets = write(&self.placed_bets);
        if let Some(stakes) = placed_bets.get_mut(bet_id) {
            stakes.retain(|p| p.id != placed_bet_id);
            if stakes.is_empty() {
                placed_bets.remove(bet_id);
            }
        }
    }

    fn placed_bets_for_bet(&self, bet_id: &str) -> Vec<PlacedBet> {
        read(&self.placed_bets).get(bet_id).cloned().unwrap_or_default()
    }

    fn placed_bets_for_user(&self, user_id: &str) -> Vec<PlacedBet> {
        let mut found: Vec<PlacedBet> = read(&self.placed_bets)
            .values()
            .flat_map(|v| v.iter().filter(|p| p.user_id == user_id).cloned())
            .collect();
        found.sort_by(|a, b| a.placed_at.cmp(&b.placed_at));
        found
    }

    fn insert_fire_back(&self, fire_back: FireBack) -> WagerResult<Shared<FireBack>> {
        let id = fire_back.id.clone();
        let bet_id = fire_back.bet_id.clone();
        let handle = Arc::new(Mutex::new(fire_back));
        {
            let mut fire_backs = write(&self.fire_backs);
            if fire_backs.contains_key(&id) {
                return Err(WagerError::Storage(format!("Duplicate Fire Back id {}", id)));
            }
            fire_backs.insert(id.clone(), handle.clone());
        }
        write(&self.fire_backs_by_bet).entry(bet_id).or_insert_with(Vec::new).push(id);
        Ok(handle)
    }

    fn fire_back(&self, fire_back_id: &str) -> Option<Shared<FireBack>> {
        read(&self.fire_backs).get(fire_back_id).cloned()
    }

    fn fire_backs_for_bet(&self, bet_id: &str) -> Vec<FireBack> {
        let ids = read(&self.fire_backs_by_bet).get(bet_id).cloned().unwrap_or_default();
        let fire_backs = read(&self.fire_backs);
        ids.iter()
            .filter_map(|id| fire_backs.get(id))
            .map(|f| lock(f).clone())
            .collect()
    }
}

impl UserStore for MemoryStore {
    fn insert_account(&self, account: Account) -> WagerResult<Shared<Account>> {
        let mut accounts = write(&self.accounts);
        if accounts.contains_key(&account.user_id) {
            return Err(WagerError::AccountExists(account.user_id));
        }
        let id = account.user_id.clone();
        let handle = Arc::new(Mutex::new(account));
        accounts.insert(id, handle.clone());
        Ok(handle)
    }

    fn account(&self, user_id: &str) -> Option<Shared<Account>> {
        read(&self.accounts).get(user_id).cloned()
    }

    fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = read(&self.accounts).keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub bets: Vec<Bet>,
    pub placed_bets: Vec<PlacedBet>,
    pub fire_backs: Vec<FireBack>,
    pub accounts: Vec<Account>,
}
