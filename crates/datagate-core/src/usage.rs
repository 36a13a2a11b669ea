use serde::Serialize;
use std::collections::BTreeMap;

/// In-process call counters since start (or the last reset).
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UsageStats {
    pub started_at_epoch_s: u64,
    pub tool_calls: BTreeMap<String, u64>,
    pub total_calls: u64,
}

impl UsageStats {
    pub fn new(now_epoch_s: u64) -> Self {
        Self {
            started_at_epoch_s: now_epoch_s,
            ..Self::default()
        }
    }

    pub fn record(&mut self, tool: &str) {
        *self.tool_calls.entry(tool.to_string()).or_insert(0) += 1;
        self.total_calls += 1;
    }

    pub fn calls_for(&self, tool: &str) -> u64 {
        self.tool_calls.get(tool).copied().unwrap_or(0)
    }
}
