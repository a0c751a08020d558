// Human-readable feed of engine events (stakes, status changes, Fire Back notices).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

use crate::store::lock;

pub const MAX_ACTIVITY_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub emoji: String,
    pub action: String,
    pub details: String,
    pub bet_id: Option<String>,
}

impl std::fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {} | {}",
            self.timestamp.format("%H:%M:%S"),
            self.emoji,
            self.action,
            self.details
        )
    }
}

#[derive(Debug, Default)]
pub struct ActivityFeed {
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, at: DateTime<Utc>, emoji: &str, action: &str, bet_id: Option<&str>, details: String) {
        let entry = ActivityEntry {
            timestamp: at,
            emoji: emoji.to_string(),
            action: action.to_uppercase(),
            details,
            bet_id: bet_id.map(str::to_string),
        };
        info!("{}", entry);

        let mut entries = lock(&self.entries);
        entries.push_back(entry);
        while entries.len() > MAX_ACTIVITY_ENTRIES {
            entries.pop_front();
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        lock(&self.entries).iter().rev().take(limit).cloned().collect()
    }

    pub fn for_bet(&self, bet_id: &str) -> Vec<ActivityEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.bet_id.as_deref() == Some(bet_id))
            .cloned()
            .collect()
    }
}
