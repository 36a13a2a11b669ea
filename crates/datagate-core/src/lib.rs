use serde::{Deserialize, Serialize};
use std::fmt;

pub mod auth;
pub mod catalog;
pub mod gate;
pub mod ratelimit;
pub mod search;
pub mod snapshot;
pub mod usage;

pub use auth::{derive_session, AuthRequest, CallContext, Session, ZoneDefaults};
pub use gate::CallGate;
pub use ratelimit::{RateLimitConfig, SlidingWindow};
pub use snapshot::{ProgressSink, SnapshotJob, SnapshotSource, SnapshotState, SnapshotStatus};
pub use usage::UsageStats;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unauthorized: missing token")]
    MissingToken,
    #[error("unauthorized: invalid token format")]
    InvalidTokenFormat,
    #[error("rate limit exceeded: {display}")]
    RateLimited { display: String },
    /// Non-success status from the upstream API. Displays as the normalized
    /// `HTTP <status>: <body>` message.
    #[error("HTTP {status}: {body}")]
    UpstreamHttp {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timeout waiting for data after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error(
        "no browser zone for this session; pass ?browser=<zone> on the connection URL or set BROWSER_ZONE"
    )]
    BrowserZoneMissing,
}

impl Error {
    /// Errors the snapshot poller absorbs and retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UpstreamHttp { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Output format requested from the universal request endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeFormat {
    Markdown,
    Html,
}

impl ScrapeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ScrapeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    pub zone: String,
    pub format: ScrapeFormat,
}

#[async_trait::async_trait]
pub trait ScrapeBackend: Send + Sync {
    async fn scrape(&self, token: &str, req: &ScrapeRequest) -> Result<String>;
}
