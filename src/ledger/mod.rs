//! Per-user cumulative counts, session history and achievements.

pub mod accounts;
pub mod achievements;
pub mod store;

pub use accounts::UserRecord;
pub use store::JsonStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("username {0} already exists")]
    UsernameTaken(String),

    #[error("unknown user or wrong password")]
    AuthenticationFailed,

    #[error("store lock poisoned")]
    Poisoned,
}

/// One analysed session as kept in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// When the session was recorded (UTC)
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    /// Jumps counted in the clip
    pub count: u64,
    /// Sampled clip length in seconds
    pub duration_seconds: f64,
    /// Jumps per minute, one decimal
    pub cadence_spm: f64,
}

/// A single user's ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBucket {
    /// Jumps since the last reset
    #[serde(default)]
    pub total_count: u64,
    /// Unlocked achievement names
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    /// Every recorded session, oldest first; survives reset
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl UserBucket {
    /// Add a session and return the badges it unlocked.
    pub fn apply_session(&mut self, record: SessionRecord) -> Vec<String> {
        let prev_total = self.total_count;
        let new_total = prev_total.saturating_add(record.count);

        let unlocked: Vec<String> = achievements::crossed(prev_total, new_total)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.achievements.extend(unlocked.iter().cloned());
        self.total_count = new_total;
        self.sessions.push(record);
        unlocked
    }

    /// Zero the total and badges; history stays.
    pub fn reset(&mut self) {
        self.total_count = 0;
        self.achievements.clear();
    }
}

/// Where analysed sessions end up.
pub trait Ledger {
    /// Record a session and return the names of newly unlocked achievements.
    fn record_session(
        &self,
        user_id: &str,
        count: u64,
        duration_seconds: f64,
        cadence_spm: f64,
    ) -> Result<Vec<String>, LedgerError>;

    /// Current state for `user_id`; an unknown user has an empty bucket.
    fn get_bucket(&self, user_id: &str) -> Result<UserBucket, LedgerError>;

    /// Clear total and achievements for `user_id`, keeping sessions.
    fn reset(&self, user_id: &str) -> Result<UserBucket, LedgerError>;
}

impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    fn record_session(
        &self,
        user_id: &str,
        count: u64,
        duration_seconds: f64,
        cadence_spm: f64,
    ) -> Result<Vec<String>, LedgerError> {
        (**self).record_session(user_id, count, duration_seconds, cadence_spm)
    }

    fn get_bucket(&self, user_id: &str) -> Result<UserBucket, LedgerError> {
        (**self).get_bucket(user_id)
    }

    fn reset(&self, user_id: &str) -> Result<UserBucket, LedgerError> {
        (**self).reset(user_id)
    }
}
