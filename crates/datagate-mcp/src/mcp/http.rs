//! Streamable-HTTP transport. Requests to `/mcp` pass through middleware
//! that authenticates the caller and attaches its [`Session`]; the MCP handler
//! reads it back from the request parts.
//!
//! The session derived on the request that opens an MCP session is bound to
//! the `mcp-session-id` the server hands out. Later requests on that id reuse
//! the bound session and must present the same credential.

use super::DatagateMcp;
use crate::config::Config;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use datagate_core::{derive_session, AuthRequest, Error, Session, ZoneDefaults};
use datagate_upstream::{UpstreamClient, ZoneProvisioner};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Clone)]
pub(crate) struct AuthState {
    zones: Arc<ZoneDefaults>,
    provisioner: Arc<ZoneProvisioner>,
    bound: Arc<Mutex<HashMap<String, Session>>>,
}

impl AuthState {
    pub(crate) fn new(zones: ZoneDefaults, upstream: UpstreamClient) -> Self {
        Self {
            zones: Arc::new(zones),
            provisioner: Arc::new(ZoneProvisioner::new(upstream)),
            bound: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.bound.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bound_session(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// First binding wins; a session id never changes owner.
    fn bind(&self, id: String, session: Session) {
        self.lock().entry(id).or_insert(session);
    }

    fn unbind(&self, id: &str) {
        self.lock().remove(id);
    }
}

/// Why a request was turned away with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingToken,
    InvalidTokenFormat,
    SessionMismatch,
}

impl Rejection {
    fn reason(self) -> &'static str {
        match self {
            Self::MissingToken => "missing token",
            Self::InvalidTokenFormat => "invalid token format",
            Self::SessionMismatch => "credential does not match session",
        }
    }
}

impl From<&Error> for Rejection {
    fn from(e: &Error) -> Self {
        match e {
            Error::MissingToken => Self::MissingToken,
            _ => Self::InvalidTokenFormat,
        }
    }
}

/// Session for a request that names an already-bound MCP session. The
/// request's credential must match; its zone overrides are ignored.
fn resume(bound: Session, auth: &AuthRequest) -> Result<Session, Rejection> {
    match auth.credential() {
        None => Err(Rejection::MissingToken),
        Some(token) if token == bound.token() => Ok(bound),
        Some(_) => Err(Rejection::SessionMismatch),
    }
}

/// Wire up with `middleware::from_fn_with_state(state, authenticate)`.
pub(crate) async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = AuthRequest::from_parts(
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        request.uri().query(),
    );
    let session_id = header_str(request.headers(), SESSION_ID_HEADER);

    let bound = session_id.as_deref().and_then(|id| state.bound_session(id));
    let fresh = bound.is_none();
    let session = match bound {
        Some(bound) => resume(bound, &auth),
        None => derive_session(&auth, &state.zones).map_err(|e| Rejection::from(&e)),
    };
    let session = match session {
        Ok(s) => s,
        Err(r) => return unauthorized(r),
    };
    if fresh {
        state
            .provisioner
            .ensure_best_effort(session.token(), session.unlocker_zone())
            .await;
    }

    let closing = request.method() == Method::DELETE;
    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    match session_id {
        Some(id) if closing && response.status().is_success() => state.unbind(&id),
        Some(_) => {}
        None => {
            if let Some(id) = header_str(response.headers(), SESSION_ID_HEADER) {
                tracing::debug!(?session, "bound MCP session");
                state.bind(id, session);
            }
        }
    }
    response
}

fn header_str(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn unauthorized(rejection: Rejection) -> Response {
    let reason = rejection.reason();
    tracing::warn!(reason, "rejected unauthenticated request");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "unauthorized", "reason": reason })),
    )
        .into_response()
}

pub(crate) fn protect(routes: Router, state: AuthState) -> Router {
    routes.layer(middleware::from_fn_with_state(state, authenticate))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "name": "datagate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) fn router(server: DatagateMcp, state: AuthState) -> Router {
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let protected = protect(Router::new().nest_service("/mcp", mcp), state);
    Router::new().route("/health", get(health)).merge(protected)
}

pub(crate) async fn serve_http(cfg: Config, addr: SocketAddr) -> anyhow::Result<()> {
    let upstream = UpstreamClient::from_env()?;
    let state = AuthState::new(cfg.zones.clone(), upstream.clone());
    let server = DatagateMcp::new(&cfg, upstream);
    let tools = server.registry().names().len();
    let app = router(server, state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        toolset = cfg.toolset.as_str(),
        tools,
        "serving MCP over HTTP at /mcp"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Session attached by [`authenticate`].
pub(crate) fn session_of(parts: &axum::http::request::Parts) -> Option<&Session> {
    parts.extensions.get::<Session>()
}
