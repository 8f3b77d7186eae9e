//! Session configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use trackview_edit::HistoryConfig;
use trackview_live::{FeedConfig, SyncConfig};
use trackview_timeline::TimelineConfig;

use crate::error::SessionError;

/// Everything a [`TrackSession`](crate::TrackSession) can be tuned with
///
/// Every table is optional in TOML; missing keys keep their defaults.
///
/// ```toml
/// [feed.reconnect]
/// base_delay_ms = 500
/// max_attempts = 10
///
/// [sync]
/// region_refresh_interval_ms = 5000
///
/// [history]
/// capacity = 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub feed: FeedConfig,
    pub sync: SyncConfig,
    pub timeline: TimelineConfig,
    pub history: HistoryConfig,
}

impl SessionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_timeline(mut self, timeline: TimelineConfig) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}
