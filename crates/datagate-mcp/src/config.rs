use crate::mcp::registry::Toolset;
use datagate_core::{RateLimitConfig, ZoneDefaults};

/// Options shared by every command that builds a server.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct ServerOpts {
    /// Default API token. Only used when a call has no authenticated session
    /// (stdio mode); HTTP callers always bring their own.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub(crate) api_token: Option<String>,
    /// Default unlocker zone (falls back to `mcp_unlocker`).
    #[arg(long, env = "WEB_UNLOCKER_ZONE")]
    pub(crate) unlocker_zone: Option<String>,
    /// Default browser zone.
    #[arg(long, env = "BROWSER_ZONE")]
    pub(crate) browser_zone: Option<String>,
    /// Server-wide call budget as `<count>/<duration><unit>`, unit one of s, m, h
    /// (e.g. `100/1h`). Unset means unlimited.
    #[arg(long, env = "RATE_LIMIT", value_parser = parse_rate_limit)]
    pub(crate) rate_limit: Option<RateLimitConfig>,
    /// Which tools to expose.
    #[arg(long, env = "DATAGATE_TOOLSET", value_enum, default_value_t = Toolset::Full)]
    pub(crate) toolset: Toolset,
}

fn parse_rate_limit(s: &str) -> Result<RateLimitConfig, String> {
    s.parse::<RateLimitConfig>().map_err(|e| e.to_string())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolved process configuration. Read-only once the server starts.
#[derive(Clone, Default)]
pub(crate) struct Config {
    pub(crate) api_token: Option<String>,
    pub(crate) zones: ZoneDefaults,
    pub(crate) rate_limit: Option<RateLimitConfig>,
    pub(crate) toolset: Toolset,
}

impl From<ServerOpts> for Config {
    fn from(o: ServerOpts) -> Self {
        Self {
            api_token: non_empty(o.api_token),
            zones: ZoneDefaults {
                unlocker: non_empty(o.unlocker_zone),
                browser: non_empty(o.browser_zone),
            },
            rate_limit: o.rate_limit,
            toolset: o.toolset,
        }
    }
}

impl Config {
    /// Configuration summary for `doctor`. Secrets appear as booleans only.
    pub(crate) fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "api_token": self.api_token.is_some(),
            "unlocker_zone": self.zones.unlocker,
            "browser_zone": self.zones.browser,
            "rate_limit": self.rate_limit.as_ref().map(|r| serde_json::json!({
                "display": r.display,
                "limit": r.limit,
                "window_ms": r.window_ms() as u64,
            })),
            "toolset": self.toolset.as_str(),
        })
    }
}
