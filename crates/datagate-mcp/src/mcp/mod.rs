//! MCP server: tool listing, dispatch and the two transports.

pub(crate) mod envelope;
pub(crate) mod http;
mod invoke;
mod progress;
pub(crate) mod registry;
mod tools;

use crate::config::Config;
use datagate_core::{CallGate, ProgressSink, Session, ZoneDefaults};
use datagate_upstream::{SnapshotPoller, UpstreamClient, ZoneProvisioner};
use envelope::{tool_error, tool_result};
use progress::PeerProgress;
use registry::ToolRegistry;
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use std::sync::Arc;

/// One instance per process. Clones share the gate, so the rate limit and
/// usage counters span every connection.
#[derive(Clone)]
pub(crate) struct DatagateMcp {
    upstream: Arc<UpstreamClient>,
    gate: Arc<CallGate>,
    registry: Arc<ToolRegistry>,
    poller: SnapshotPoller,
    default_token: Option<Arc<str>>,
    zones: Arc<ZoneDefaults>,
}

impl DatagateMcp {
    pub(crate) fn new(cfg: &Config, upstream: UpstreamClient) -> Self {
        Self {
            upstream: Arc::new(upstream),
            gate: Arc::new(CallGate::new(cfg.rate_limit.clone())),
            registry: Arc::new(ToolRegistry::new(cfg.toolset)),
            poller: SnapshotPoller::default(),
            default_token: cfg.api_token.as_deref().map(Arc::from),
            zones: Arc::new(cfg.zones.clone()),
        }
    }

    pub(crate) fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

/// Session attached by the HTTP auth middleware, if any. stdio requests
/// carry no HTTP parts.
fn session_from(context: &RequestContext<RoleServer>) -> Option<Session> {
    context
        .extensions
        .get::<axum::http::request::Parts>()
        .and_then(http::session_of)
        .cloned()
}

impl ServerHandler for DatagateMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Web search, unblocked scraping and structured dataset collection. \
                 Tool failures are isError results with a {code, message, hint, retryable} object."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.registry.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(def) = self.registry.get(&request.name) else {
            return Err(McpError::invalid_params(
                format!("unknown tool: {}", request.name),
                None,
            ));
        };
        let session = session_from(&context);
        let progress = PeerProgress::from_context(&context);
        let args = request.arguments.unwrap_or_default();

        let out = self
            .invoke(
                def,
                session.as_ref(),
                args,
                progress.as_ref().map(|p| p as &dyn ProgressSink),
            )
            .await;
        Ok(match out {
            Ok(text) => tool_result(text),
            Err(e) => tool_error(&def.name, &e),
        })
    }
}

pub(crate) async fn serve_stdio(cfg: Config) -> anyhow::Result<()> {
    let upstream = UpstreamClient::from_env()?;
    if let Some(token) = cfg.api_token.as_deref() {
        let zone = cfg
            .zones
            .unlocker
            .as_deref()
            .unwrap_or(datagate_core::auth::DEFAULT_UNLOCKER_ZONE);
        ZoneProvisioner::new(upstream.clone())
            .ensure_best_effort(token, zone)
            .await;
    }
    let svc = DatagateMcp::new(&cfg, upstream);
    tracing::info!(
        toolset = svc.registry.toolset().as_str(),
        tools = svc.registry.names().len(),
        "serving MCP over stdio"
    );
    let running = svc.serve(stdio()).await?;
    // Keep the stdio server alive until the client closes.
    running.waiting().await?;
    Ok(())
}
