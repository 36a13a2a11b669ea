//! Asynchronous dataset jobs: trigger, then poll the snapshot until ready.

use crate::Result;
use serde::Serialize;
use std::time::Duration;

pub const MAX_POLL_ATTEMPTS: u32 = 600;
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One poll of the snapshot endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotStatus {
    Running,
    Ready(serde_json::Value),
}

impl SnapshotStatus {
    /// `{"status": "running"}` keeps polling; any other body is the final payload.
    pub fn classify(body: serde_json::Value) -> Self {
        match body.get("status").and_then(|s| s.as_str()) {
            Some("running") => Self::Running,
            _ => Self::Ready(body),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Triggered,
    Polling,
    Ready,
    TimedOut,
    Failed,
}

/// Bookkeeping for one trigger-then-poll run. Owned by the poll loop that
/// created it.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotJob {
    pub snapshot_id: String,
    pub state: SnapshotState,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl SnapshotJob {
    pub fn new(snapshot_id: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            state: SnapshotState::Triggered,
            attempt: 0,
            max_attempts,
        }
    }

    /// Count one poll. Saturates at `max_attempts`.
    pub fn record_attempt(&mut self) {
        self.state = SnapshotState::Polling;
        self.attempt = (self.attempt + 1).min(self.max_attempts);
    }

    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Upstream side of a dataset job.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Start a collection; returns the snapshot id.
    async fn trigger(&self, dataset_id: &str, inputs: &serde_json::Value) -> Result<String>;
    async fn snapshot(&self, snapshot_id: &str) -> Result<SnapshotStatus>;
}

/// Advisory progress channel (e.g. MCP progress notifications).
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn progress(&self, done: u32, total: u32, message: String);
}
