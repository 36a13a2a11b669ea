use datagate_core::ProgressSink;
use rmcp::model::{ProgressNotificationParam, ProgressToken};
use rmcp::service::{Peer, RequestContext, RoleServer};

/// Forwards poller progress to the client as `notifications/progress`.
pub(crate) struct PeerProgress {
    peer: Peer<RoleServer>,
    token: ProgressToken,
}

impl PeerProgress {
    /// `None` when the client did not ask for progress on this request.
    pub(crate) fn from_context(context: &RequestContext<RoleServer>) -> Option<Self> {
        context.meta.get_progress_token().map(|token| Self {
            peer: context.peer.clone(),
            token,
        })
    }
}

#[async_trait::async_trait]
impl ProgressSink for PeerProgress {
    async fn progress(&self, done: u32, total: u32, message: String) {
        let param = ProgressNotificationParam {
            progress_token: self.token.clone(),
            progress: f64::from(done),
            total: Some(f64::from(total)),
            message: Some(message),
        };
        if let Err(e) = self.peer.notify_progress(param).await {
            tracing::debug!(error = %e, "progress notification dropped");
        }
    }
}
