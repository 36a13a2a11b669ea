use datagate_core::{Error, Result, ScrapeBackend, ScrapeFormat, ScrapeRequest};
use serde::Serialize;
use std::time::Instant;

pub mod browser;
pub mod datasets;
pub mod poll;
pub mod zones;

pub use datasets::DatasetSource;
pub use poll::SnapshotPoller;
pub use zones::ZoneProvisioner;

pub const DEFAULT_API_BASE: &str = "https://api.brightdata.com";

/// Upstream base URL. Overridable for tests and enterprise proxies.
pub fn api_base_from_env() -> String {
    std::env::var("DATAGATE_API_BASE")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Fixed client identifier sent with every upstream call.
pub fn client_id() -> String {
    format!("datagate/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base: String,
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    url: &'a str,
    zone: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_format: Option<&'static str>,
}

impl UpstreamClient {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self::with_client(client, base))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(api_base_from_env())
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Endpoint URL with each segment percent-encoded as a path segment.
    pub(crate) fn endpoint_with_segments(&self, segments: &[&str]) -> Result<url::Url> {
        let mut u = url::Url::parse(&self.base)
            .map_err(|e| Error::Config(format!("invalid API base {:?}: {e}", self.base)))?;
        u.path_segments_mut()
            .map_err(|_| Error::Config(format!("API base cannot take a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(u)
    }

    pub(crate) fn get(&self, token: &str, path: &str) -> reqwest::RequestBuilder {
        self.get_url(token, self.endpoint(path))
    }

    pub(crate) fn get_url(&self, token: &str, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, client_id())
    }

    pub(crate) fn post(&self, token: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, client_id())
    }

    /// One call to the universal request endpoint. No retries.
    pub async fn request(&self, token: &str, req: &ScrapeRequest) -> Result<String> {
        let t0 = Instant::now();
        let body = RequestBody {
            url: &req.url,
            zone: &req.zone,
            format: "raw",
            data_format: match req.format {
                ScrapeFormat::Markdown => Some("markdown"),
                ScrapeFormat::Html => None,
            },
        };
        let resp = send(self.post(token, "/request").json(&body)).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        tracing::debug!(
            url = %req.url,
            zone = %req.zone,
            format = %req.format,
            bytes = text.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "upstream request done"
        );
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ScrapeBackend for UpstreamClient {
    async fn scrape(&self, token: &str, req: &ScrapeRequest) -> Result<String> {
        self.request(token, req).await
    }
}

/// Send and turn any non-2xx status into `Error::UpstreamHttp` with the body attached.
pub(crate) async fn send(rb: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let resp = rb
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = match resp.text().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(status = status.as_u16(), error = %e, "failed to read error body");
            String::new()
        }
    };
    Err(Error::UpstreamHttp {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        body,
    })
}

pub(crate) async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value> {
    let text = resp
        .text()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::UpstreamProtocol(format!("expected a JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    #[test]
    fn api_base_override_and_blank_fallback() {
        {
            let _g = EnvGuard::set("DATAGATE_API_BASE", "http://127.0.0.1:9999/");
            assert_eq!(api_base_from_env(), "http://127.0.0.1:9999");
        }
        let _g = EnvGuard::set("DATAGATE_API_BASE", "   ");
        assert_eq!(api_base_from_env(), DEFAULT_API_BASE);
    }

    #[test]
    fn markdown_requests_ask_for_markdown_conversion() {
        let b = RequestBody {
            url: "https://example.com",
            zone: "z",
            format: "raw",
            data_format: Some("markdown"),
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["data_format"], "markdown");
        let b = RequestBody {
            data_format: None,
            ..b
        };
        let v = serde_json::to_value(&b).unwrap();
        assert!(v.get("data_format").is_none());
        assert_eq!(v["format"], "raw");
    }

    #[test]
    fn client_id_names_the_crate_version() {
        assert!(client_id().starts_with("datagate/"));
    }

    #[tokio::test]
    async fn truncated_error_body_still_yields_the_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            // Promise more body than is sent, then hang up.
            sock.write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
        });

        let c = UpstreamClient::new(format!("http://{addr}")).unwrap();
        let e = send(c.get("tok", "/status")).await.unwrap_err();
        match e {
            Error::UpstreamHttp { status, body, .. } => {
                assert_eq!(status, 502);
                assert_eq!(body, "");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
