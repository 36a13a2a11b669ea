use datagate_core::Error;
use rmcp::model::{CallToolResult, Content};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    Unauthorized,
    RateLimited,
    UpstreamHttp,
    UpstreamProtocol,
    Transport,
    Timeout,
    NotConfigured,
    BrowserZoneMissing,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::UpstreamHttp => "upstream_http",
            Self::UpstreamProtocol => "upstream_protocol",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::NotConfigured => "not_configured",
            Self::BrowserZoneMissing => "browser_zone_missing",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::RateLimited | Self::UpstreamHttp | Self::Transport | Self::Timeout => true,
            // Configuration and input problems need a change before a retry helps.
            Self::InvalidParams
            | Self::Unauthorized
            | Self::UpstreamProtocol
            | Self::NotConfigured
            | Self::BrowserZoneMissing => false,
        }
    }

    pub(crate) fn hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Check the tool's input schema (tools/list) and fix the arguments.",
            Self::Unauthorized => {
                "Pass a valid API token (Authorization: Bearer <token> or ?token=<token>)."
            }
            Self::RateLimited => {
                "The server-wide RATE_LIMIT window is full. Wait for older calls to age out, then retry."
            }
            Self::UpstreamHttp => {
                "The upstream API rejected the request. Check the token, zone names and target URL; 5xx responses are often transient."
            }
            Self::UpstreamProtocol => {
                "The upstream API answered with an unexpected shape. Retrying rarely helps; check DATAGATE_API_BASE."
            }
            Self::Transport => "Could not reach the upstream API. Check network access and DATAGATE_API_BASE.",
            Self::Timeout => {
                "The dataset snapshot was not ready within the polling budget. Trigger the collection again later."
            }
            Self::NotConfigured => {
                "No authenticated session. Set API_TOKEN for stdio mode, or connect over HTTP with a token."
            }
            Self::BrowserZoneMissing => {
                "Pass ?browser=<zone> on the connection URL or set BROWSER_ZONE."
            }
        }
    }
}

impl From<&Error> for ErrorCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::MissingToken | Error::InvalidTokenFormat => Self::Unauthorized,
            Error::RateLimited { .. } => Self::RateLimited,
            Error::UpstreamHttp { .. } => Self::UpstreamHttp,
            Error::UpstreamProtocol(_) => Self::UpstreamProtocol,
            Error::Transport(_) => Self::Transport,
            Error::Timeout { .. } => Self::Timeout,
            Error::InvalidParams(_) => Self::InvalidParams,
            Error::Config(_) | Error::NotConfigured(_) => Self::NotConfigured,
            Error::BrowserZoneMissing => Self::BrowserZoneMissing,
        }
    }
}

pub(crate) fn error_obj(code: ErrorCode, message: impl ToString) -> serde_json::Value {
    serde_json::json!({
        "code": code.as_str(),
        "message": message.to_string(),
        "hint": code.hint(),
        "retryable": code.retryable(),
    })
}

pub(crate) fn tool_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// `isError` result: the message as text, plus the error object as
/// structured content for machine consumers.
pub(crate) fn tool_error(tool: &str, e: &Error) -> CallToolResult {
    let code = ErrorCode::from(e);
    let mut r = CallToolResult::error(vec![Content::text(e.to_string())]);
    r.structured_content = Some(serde_json::json!({
        "ok": false,
        "tool": tool,
        "error": error_obj(code, e),
    }));
    r
}
