/// Fire Back - Friendly Wagers Engine
/// Exports all modules for use as a library crate

pub mod activity;
pub mod app_state;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod market;
pub mod models;
pub mod money;
pub mod routes;
pub mod store;

pub use activity::{ActivityEntry, ActivityFeed};
pub use app_state::{AppState, SharedState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{PlacementReceipt, SettlementReport, WagerEngine};
pub use error::{WagerError, WagerResult};
pub use ledger::{payout_reference, Account, EntryKind, Ledger, LedgerEntry, LedgerStats};
pub use market::{
    effective_status, Bet, BetOption, BetStatus, FireBack, FireBackStatus, NewBet, NewOption,
    OddsPolicy, OpeningStake, PlacedBet, Visibility, WagerPool,
};
pub use routes::router;
pub use store::{BetStore, MemoryStore, StoreSnapshot, UserStore};
