//! The one wrapper every tool call goes through: admission (rate limit and
//! usage count), context resolution, the browser-zone guard, then the tool,
//! with timing and failure logging around all of it.

use super::registry::ToolDef;
use super::DatagateMcp;
use datagate_core::{CallContext, Error, ProgressSink, Result, Session};
use rmcp::model::JsonObject;
use std::time::Instant;

impl DatagateMcp {
    pub(crate) async fn invoke(
        &self,
        def: &ToolDef,
        session: Option<&Session>,
        args: JsonObject,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String> {
        let t0 = Instant::now();
        let out = self.run(def, session, &args, progress).await;
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &out {
            Ok(_) => tracing::info!(tool = %def.name, elapsed_ms, "tool call ok"),
            Err(Error::UpstreamHttp {
                status,
                reason,
                body,
            }) => tracing::warn!(
                tool = %def.name,
                elapsed_ms,
                status = *status,
                reason = %reason,
                body = %body,
                "tool call failed: upstream HTTP error"
            ),
            Err(e) => tracing::error!(tool = %def.name, elapsed_ms, error = ?e, "tool call failed"),
        }
        out
    }

    async fn run(
        &self,
        def: &ToolDef,
        session: Option<&Session>,
        args: &JsonObject,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String> {
        self.gate.admit(&def.name)?;
        let ctx = self.resolve_context(session)?;
        if def.kind.needs_browser() {
            ctx.require_browser_zone()?;
        }
        self.execute(def, &ctx, args, progress).await
    }

    /// A session's own zones are authoritative; without one, only the
    /// configured process defaults apply.
    pub(crate) fn resolve_context(&self, session: Option<&Session>) -> Result<CallContext> {
        match session {
            Some(s) => Ok(CallContext::from_session(s)),
            None => CallContext::from_defaults(self.default_token.as_deref(), &self.zones),
        }
    }
}
