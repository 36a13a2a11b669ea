//! Bounded trigger-then-poll loop for dataset snapshots.
//!
//! There is no completion callback upstream, so the job is polled once per
//! interval up to `max_attempts`. Transport and HTTP errors while polling are
//! counted as attempts and retried; anything else ends the job.

use datagate_core::snapshot::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use datagate_core::{
    Error, ProgressSink, Result, SnapshotJob, SnapshotSource, SnapshotState, SnapshotStatus,
};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotPoller {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for SnapshotPoller {
    fn default() -> Self {
        Self {
            max_attempts: MAX_POLL_ATTEMPTS,
            interval: POLL_INTERVAL,
        }
    }
}

impl SnapshotPoller {
    /// Trigger `dataset_id` and poll the resulting snapshot to completion.
    /// A trigger failure is returned as-is, without polling.
    pub async fn collect<S>(
        &self,
        source: &S,
        dataset_id: &str,
        inputs: &serde_json::Value,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<serde_json::Value>
    where
        S: SnapshotSource + ?Sized,
    {
        let snapshot_id = source.trigger(dataset_id, inputs).await?;
        tracing::info!(dataset_id, snapshot_id = %snapshot_id, "dataset triggered");
        self.poll(source, &snapshot_id, progress).await
    }

    pub async fn poll<S>(
        &self,
        source: &S,
        snapshot_id: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<serde_json::Value>
    where
        S: SnapshotSource + ?Sized,
    {
        let mut job = SnapshotJob::new(snapshot_id, self.max_attempts);

        while !job.exhausted() {
            let outcome = source.snapshot(snapshot_id).await;
            job.record_attempt();

            let status = match outcome {
                Ok(SnapshotStatus::Ready(data)) => {
                    job.state = SnapshotState::Ready;
                    report(progress, &job, "ready".to_string()).await;
                    tracing::info!(
                        snapshot_id,
                        attempts = job.attempt,
                        "snapshot ready"
                    );
                    return Ok(data);
                }
                Ok(SnapshotStatus::Running) => "running".to_string(),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        snapshot_id,
                        attempt = job.attempt,
                        error = %e,
                        "snapshot poll failed; retrying"
                    );
                    format!("poll error, retrying: {e}")
                }
                Err(e) => {
                    job.state = SnapshotState::Failed;
                    tracing::error!(
                        snapshot_id,
                        attempt = job.attempt,
                        error = %e,
                        "snapshot poll failed"
                    );
                    return Err(e);
                }
            };
            report(progress, &job, status).await;

            if !job.exhausted() {
                tokio::time::sleep(self.interval).await;
            }
        }

        job.state = SnapshotState::TimedOut;
        tracing::warn!(snapshot_id, attempts = job.attempt, "snapshot timed out");
        Err(Error::Timeout {
            attempts: job.max_attempts,
        })
    }
}

async fn report(progress: Option<&dyn ProgressSink>, job: &SnapshotJob, message: String) {
    if let Some(p) = progress {
        p.progress(job.attempt, job.max_attempts, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    enum Step {
        Running,
        Ready(serde_json::Value),
        Transient,
        Malformed,
    }

    /// Plays `script` in order, then reports `running` forever.
    struct Scripted {
        script: Mutex<VecDeque<Step>>,
        polls: AtomicU32,
        triggered: Mutex<Vec<(String, serde_json::Value)>>,
        trigger_fails: bool,
    }

    impl Scripted {
        fn new(script: Vec<Step>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicU32::new(0),
                triggered: Mutex::new(Vec::new()),
                trigger_fails: false,
            }
        }

        fn polls(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SnapshotSource for Scripted {
        async fn trigger(&self, dataset_id: &str, inputs: &serde_json::Value) -> Result<String> {
            if self.trigger_fails {
                return Err(Error::UpstreamProtocol("no snapshot ID".to_string()));
            }
            self.triggered
                .lock()
                .unwrap()
                .push((dataset_id.to_string(), inputs.clone()));
            Ok("s_test".to_string())
        }

        async fn snapshot(&self, snapshot_id: &str) -> Result<SnapshotStatus> {
            assert_eq!(snapshot_id, "s_test");
            self.polls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            match step.unwrap_or(Step::Running) {
                Step::Running => Ok(SnapshotStatus::Running),
                Step::Ready(v) => Ok(SnapshotStatus::Ready(v)),
                Step::Transient => Err(Error::UpstreamHttp {
                    status: 502,
                    reason: "Bad Gateway".to_string(),
                    body: "upstream hiccup".to_string(),
                }),
                Step::Malformed => Err(Error::UpstreamProtocol("not json".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(u32, u32, String)>>,
    }

    #[async_trait::async_trait]
    impl ProgressSink for Recorder {
        async fn progress(&self, done: u32, total: u32, message: String) {
            self.calls.lock().unwrap().push((done, total, message));
        }
    }

    fn running(k: usize) -> Vec<Step> {
        (0..k).map(|_| Step::Running).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn returns_payload_after_k_running_polls() {
        let k = 5;
        let mut script = running(k);
        script.push(Step::Ready(json!([{"title": "done"}])));
        let src = Scripted::new(script);
        let rec = Recorder::default();

        let t0 = tokio::time::Instant::now();
        let out = SnapshotPoller::default()
            .poll(&src, "s_test", Some(&rec))
            .await
            .unwrap();

        assert_eq!(out, json!([{"title": "done"}]));
        assert_eq!(src.polls(), k as u32 + 1);
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), k + 1);
        assert_eq!(calls.last().unwrap(), &(6, 600, "ready".to_string()));
        assert!(calls.iter().all(|(_, total, _)| *total == 600));
        // One sleep per running poll.
        assert_eq!(t0.elapsed(), Duration::from_secs(k as u64));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exactly_max_attempts() {
        let src = Scripted::new(Vec::new());
        let rec = Recorder::default();
        let err = SnapshotPoller::default()
            .poll(&src, "s_test", Some(&rec))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { attempts: 600 }), "{err}");
        assert_eq!(err.to_string(), "timeout waiting for data after 600 attempts");
        assert_eq!(src.polls(), 600);
        assert_eq!(rec.calls.lock().unwrap().len(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn absorbs_transient_errors_between_running_polls() {
        let src = Scripted::new(vec![
            Step::Running,
            Step::Running,
            Step::Transient,
            Step::Transient,
            Step::Ready(json!({"rows": 1})),
        ]);
        let rec = Recorder::default();
        let out = SnapshotPoller::default()
            .poll(&src, "s_test", Some(&rec))
            .await
            .unwrap();

        assert_eq!(out, json!({"rows": 1}));
        assert_eq!(src.polls(), 5);
        let calls = rec.calls.lock().unwrap();
        assert!(calls[2].2.starts_with("poll error, retrying"), "{calls:?}");
        assert!(calls[3].2.contains("HTTP 502"), "{calls:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_still_count_toward_the_ceiling() {
        let src = Scripted::new((0..10).map(|_| Step::Transient).collect());
        let poller = SnapshotPoller {
            max_attempts: 10,
            interval: Duration::from_secs(1),
        };
        let err = poller.poll(&src, "s_test", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 10 }), "{err}");
        assert_eq!(src.polls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn protocol_errors_end_the_job() {
        let src = Scripted::new(vec![Step::Running, Step::Malformed, Step::Running]);
        let err = SnapshotPoller::default()
            .poll(&src, "s_test", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamProtocol(_)), "{err}");
        assert_eq!(src.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn collect_triggers_then_polls() {
        let src = Scripted::new(vec![Step::Ready(json!({"ok": true}))]);
        let inputs = json!({"url": "https://example.com/p"});
        let out = SnapshotPoller::default()
            .collect(&src, "gd_x", &inputs, None)
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));
        assert_eq!(
            src.triggered.lock().unwrap().as_slice(),
            &[("gd_x".to_string(), inputs)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_failure_is_not_retried() {
        let mut src = Scripted::new(Vec::new());
        src.trigger_fails = true;
        let err = SnapshotPoller::default()
            .collect(&src, "gd_x", &json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamProtocol(_)));
        assert_eq!(src.polls(), 0);
    }
}
