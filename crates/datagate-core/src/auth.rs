//! Session derivation from inbound credential material.
//!
//! A [`Session`] is built once per caller connection and never mutated. When
//! no session exists (stdio transport) the process defaults form the
//! [`CallContext`] instead.

use crate::{Error, Result};
use std::fmt;

pub const DEFAULT_UNLOCKER_ZONE: &str = "mcp_unlocker";
pub const DEFAULT_BROWSER_ZONE: &str = "mcp_browser";

/// Credential material and zone overrides pulled off an inbound request.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// `token` URL query parameter.
    pub query_token: Option<String>,
    /// `unlocker` URL query parameter.
    pub unlocker: Option<String>,
    /// `browser` URL query parameter.
    pub browser: Option<String>,
}

impl AuthRequest {
    /// Build from an `Authorization` header and a raw URL query string.
    pub fn from_parts(authorization: Option<&str>, query: Option<&str>) -> Self {
        let mut req = Self {
            authorization: authorization.map(str::to_string),
            ..Self::default()
        };
        if let Some(q) = query {
            for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
                match k.as_ref() {
                    "token" => req.query_token = Some(v.into_owned()),
                    "unlocker" => req.unlocker = Some(v.into_owned()),
                    "browser" => req.browser = Some(v.into_owned()),
                    _ => {}
                }
            }
        }
        req
    }

    /// Bearer header wins over the URL token. A non-bearer header is ignored.
    /// The scheme name is matched case-insensitively.
    pub fn credential(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(bearer_token)
            .or(self.query_token.as_deref())
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim_start().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| rest.trim())
}

/// Process-wide zone defaults (from configuration).
#[derive(Debug, Clone, Default)]
pub struct ZoneDefaults {
    pub unlocker: Option<String>,
    pub browser: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl ZoneDefaults {
    fn unlocker_for(&self, override_: Option<&str>) -> String {
        non_empty(override_)
            .or(non_empty(self.unlocker.as_deref()))
            .unwrap_or(DEFAULT_UNLOCKER_ZONE)
            .to_string()
    }

    fn browser_for(&self, override_: Option<&str>) -> String {
        non_empty(override_)
            .or(non_empty(self.browser.as_deref()))
            .unwrap_or(DEFAULT_BROWSER_ZONE)
            .to_string()
    }
}

pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Authenticated caller identity. Fields are private so a session cannot be
/// altered once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    unlocker_zone: String,
    browser_zone: Option<String>,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        unlocker_zone: impl Into<String>,
        browser_zone: Option<String>,
    ) -> Result<Self> {
        let token = token.into();
        if !is_valid_token(&token) {
            return Err(Error::InvalidTokenFormat);
        }
        Ok(Self {
            token,
            unlocker_zone: unlocker_zone.into(),
            browser_zone,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn unlocker_zone(&self) -> &str {
        &self.unlocker_zone
    }

    pub fn browser_zone(&self) -> Option<&str> {
        self.browser_zone.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("unlocker_zone", &self.unlocker_zone)
            .field("browser_zone", &self.browser_zone)
            .finish()
    }
}

/// Validate the credential and resolve both zones.
///
/// Zone precedence: URL override, then process default, then the hardcoded
/// fallback name.
pub fn derive_session(req: &AuthRequest, defaults: &ZoneDefaults) -> Result<Session> {
    let token = req.credential().ok_or(Error::MissingToken)?;
    Session::new(
        token,
        defaults.unlocker_for(req.unlocker.as_deref()),
        Some(defaults.browser_for(req.browser.as_deref())),
    )
}

/// Credential and zones a single tool call runs with.
#[derive(Clone)]
pub struct CallContext {
    pub token: String,
    pub unlocker_zone: String,
    pub browser_zone: Option<String>,
}

impl CallContext {
    pub fn from_session(s: &Session) -> Self {
        Self {
            token: s.token.clone(),
            unlocker_zone: s.unlocker_zone.clone(),
            browser_zone: s.browser_zone.clone(),
        }
    }

    /// Context for a call with no session: only the configured process
    /// defaults apply. A missing default token is an error; there is no
    /// hardcoded credential. The browser zone has no hardcoded fallback here.
    pub fn from_defaults(token: Option<&str>, zones: &ZoneDefaults) -> Result<Self> {
        let token = non_empty(token).ok_or_else(|| {
            Error::NotConfigured("no authenticated session and API_TOKEN is not set".to_string())
        })?;
        if !is_valid_token(token) {
            return Err(Error::InvalidTokenFormat);
        }
        Ok(Self {
            token: token.to_string(),
            unlocker_zone: zones.unlocker_for(None),
            browser_zone: non_empty(zones.browser.as_deref()).map(str::to_string),
        })
    }

    pub fn require_browser_zone(&self) -> Result<&str> {
        self.browser_zone
            .as_deref()
            .ok_or(Error::BrowserZoneMissing)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("token", &"<redacted>")
            .field("unlocker_zone", &self.unlocker_zone)
            .field("browser_zone", &self.browser_zone)
            .finish()
    }
}
