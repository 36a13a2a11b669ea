//! Process-wide admission: the sliding rate-limit window and usage counters
//! behind one mutex.

use crate::ratelimit::{RateLimitConfig, SlidingWindow};
use crate::usage::UsageStats;
use crate::Result;
use std::sync::{Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug)]
struct GateState {
    window: SlidingWindow,
    usage: UsageStats,
}

/// Shared by every concurrent tool invocation (hand it out behind an `Arc`).
#[derive(Debug)]
pub struct CallGate {
    config: Option<RateLimitConfig>,
    state: Mutex<GateState>,
}

pub fn now_epoch_s() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CallGate {
    /// `None` disables rate limiting; usage is still counted.
    pub fn new(config: Option<RateLimitConfig>) -> Self {
        Self {
            config,
            state: Mutex::new(GateState {
                window: SlidingWindow::new(),
                usage: UsageStats::new(now_epoch_s()),
            }),
        }
    }

    pub fn config(&self) -> Option<&RateLimitConfig> {
        self.config.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rate-limit check, then usage increment, as one step.
    ///
    /// A rejected call is not counted.
    pub fn admit(&self, tool: &str) -> Result<()> {
        self.admit_at(tool, Instant::now())
    }

    pub fn admit_at(&self, tool: &str, now: Instant) -> Result<()> {
        let mut s = self.lock();
        if let Some(cfg) = &self.config {
            s.window.admit(cfg, now)?;
        }
        s.usage.record(tool);
        Ok(())
    }

    pub fn usage(&self) -> UsageStats {
        self.lock().usage.clone()
    }
}
