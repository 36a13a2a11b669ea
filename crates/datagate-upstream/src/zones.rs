//! Idempotent "create if absent" provisioning of the unlocker zone.

use crate::{read_json, send, UpstreamClient};
use datagate_core::{Error, Result};
use std::collections::HashSet;
use std::sync::Mutex;

impl UpstreamClient {
    pub async fn active_zones(&self, token: &str) -> Result<Vec<String>> {
        let resp = send(self.get(token, "/zone/get_active_zones")).await?;
        let v = read_json(resp).await?;
        let zones = v.as_array().ok_or_else(|| {
            Error::UpstreamProtocol("active zones: expected a JSON array".to_string())
        })?;
        Ok(zones
            .iter()
            .filter_map(|z| z.get("name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect())
    }

    pub async fn create_unlocker_zone(&self, token: &str, zone: &str) -> Result<()> {
        let body = serde_json::json!({
            "zone": { "name": zone, "type": "unblocker" },
            "plan": { "type": "unblocker" }
        });
        send(self.post(token, "/zone").json(&body)).await?;
        Ok(())
    }

    /// Returns `true` when the zone had to be created.
    pub async fn ensure_unlocker_zone(&self, token: &str, zone: &str) -> Result<bool> {
        if self.active_zones(token).await?.iter().any(|z| z == zone) {
            return Ok(false);
        }
        self.create_unlocker_zone(token, zone).await?;
        Ok(true)
    }
}

/// Runs the zone check at most once per (token, zone) per process, and never
/// fails the caller.
#[derive(Debug)]
pub struct ZoneProvisioner {
    client: UpstreamClient,
    attempted: Mutex<HashSet<(String, String)>>,
}

impl ZoneProvisioner {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            attempted: Mutex::new(HashSet::new()),
        }
    }

    /// Marks the pair as attempted; `false` if it already was.
    fn claim(&self, token: &str, zone: &str) -> bool {
        self.attempted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((token.to_string(), zone.to_string()))
    }

    /// Failures are logged and swallowed. A pair is checked once whatever the
    /// outcome; later tool calls surface a missing zone as an upstream error.
    pub async fn ensure_best_effort(&self, token: &str, zone: &str) {
        if !self.claim(token, zone) {
            return;
        }
        match self.client.ensure_unlocker_zone(token, zone).await {
            Ok(true) => tracing::info!(zone, "created unlocker zone"),
            Ok(false) => tracing::debug!(zone, "unlocker zone already exists"),
            Err(e) => {
                tracing::warn!(zone, error = %e, "zone provisioning failed; continuing");
            }
        }
    }
}
