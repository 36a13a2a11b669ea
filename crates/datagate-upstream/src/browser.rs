use crate::{read_json, send, UpstreamClient};
use datagate_core::{Error, Result};

pub const BROWSER_HOST: &str = "brd.superproxy.io:9222";

impl UpstreamClient {
    pub async fn customer_id(&self, token: &str) -> Result<String> {
        let v = read_json(send(self.get(token, "/status")).await?).await?;
        v.get("customer")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::UpstreamProtocol("status: missing customer".to_string()))
    }

    pub async fn zone_password(&self, token: &str, zone: &str) -> Result<String> {
        let rb = self.get(token, "/zone/passwords").query(&[("zone", zone)]);
        let v = read_json(send(rb).await?).await?;
        v.get("passwords")
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::UpstreamProtocol(format!("zone {zone}: no password returned"))
            })
    }

    /// Remote-browser (CDP) websocket endpoint for `zone`.
    pub async fn browser_cdp_endpoint(&self, token: &str, zone: &str) -> Result<String> {
        let customer = self.customer_id(token).await?;
        let password = self.zone_password(token, zone).await?;
        Ok(format!(
            "wss://brd-customer-{customer}-zone-{zone}:{password}@{BROWSER_HOST}"
        ))
    }
}
