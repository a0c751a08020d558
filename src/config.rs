// Engine and server configuration, read from the environment (and `.env` if present).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use tracing::warn;

use crate::market::OddsPolicy;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_STATE_FILE: &str = "data/state.json";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pricing constants for the pari-mutuel pool
    pub odds: OddsPolicy,
    /// Balance credited to accounts opened without an explicit amount
    pub starting_balance: Decimal,
    pub bind_addr: String,
    /// Where the server snapshots the store on shutdown
    pub state_file: String,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            odds: OddsPolicy::default(),
            starting_balance: dec!(100.00),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            state_file: DEFAULT_STATE_FILE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let odds = OddsPolicy {
            house_edge: env_or("HOUSE_EDGE", defaults.odds.house_edge),
            floor: env_or("ODDS_FLOOR", defaults.odds.floor),
            unbacked: env_or("UNBACKED_ODDS", defaults.odds.unbacked),
        };

        Self {
            odds,
            starting_balance: env_or("STARTING_BALANCE", defaults.starting_balance),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            state_file: std::env::var("STATE_FILE").unwrap_or(defaults.state_file),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("⚠️  Ignoring {}={:?}: not a valid value, using {}", key, raw, default);
        default
    })
}
