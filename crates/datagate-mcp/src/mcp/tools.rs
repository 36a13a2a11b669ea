use super::registry::{ToolDef, ToolKind};
use super::DatagateMcp;
use datagate_core::catalog::{check_http_url, DatasetSpec};
use datagate_core::search::{build_search_url, SearchEngine};
use datagate_core::{
    CallContext, Error, ProgressSink, Result, ScrapeBackend, ScrapeFormat, ScrapeRequest,
};
use datagate_upstream::DatasetSource;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Upper bound on items in one batch call.
pub(crate) const MAX_BATCH: usize = 10;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct SearchEngineArgs {
    /// Search query.
    pub(crate) query: String,
    /// Search engine (default: google).
    #[serde(default)]
    pub(crate) engine: Option<SearchEngine>,
    /// Results page number (0-based), as returned for the next page.
    #[serde(default)]
    pub(crate) cursor: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct SearchBatchArgs {
    /// 1 to 10 searches, run concurrently.
    pub(crate) queries: Vec<SearchEngineArgs>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScrapeArgs {
    /// Absolute http(s) URL of the page to fetch.
    pub(crate) url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScrapeBatchArgs {
    /// 1 to 10 absolute http(s) URLs, fetched concurrently as markdown.
    pub(crate) urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct EmptyArgs {}

fn parse_args<T: DeserializeOwned>(args: &JsonObject) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(args.clone()))
        .map_err(|e| Error::InvalidParams(e.to_string()))
}

fn check_batch_len(field: &str, n: usize) -> Result<()> {
    if n == 0 || n > MAX_BATCH {
        return Err(Error::InvalidParams(format!(
            "{field}: expected 1 to {MAX_BATCH} items, got {n}"
        )));
    }
    Ok(())
}

fn to_json_text(v: &serde_json::Value) -> Result<String> {
    serde_json::to_string(v).map_err(|e| Error::UpstreamProtocol(e.to_string()))
}

impl DatagateMcp {
    /// Tool logic proper. Runs after admission and the browser guard.
    pub(crate) async fn execute(
        &self,
        def: &ToolDef,
        ctx: &CallContext,
        args: &JsonObject,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String> {
        match def.kind {
            ToolKind::SearchEngine => {
                let a: SearchEngineArgs = parse_args(args)?;
                self.search(ctx, &a).await
            }
            ToolKind::SearchEngineBatch => {
                let a: SearchBatchArgs = parse_args(args)?;
                self.search_batch(ctx, &a.queries).await
            }
            ToolKind::Scrape(format) => {
                let a: ScrapeArgs = parse_args(args)?;
                self.scrape(ctx, &a.url, format).await
            }
            ToolKind::ScrapeBatch => {
                let a: ScrapeBatchArgs = parse_args(args)?;
                self.scrape_batch(ctx, &a.urls).await
            }
            ToolKind::SessionStats => self.session_stats(),
            ToolKind::BrowserEndpoint => {
                let zone = ctx.require_browser_zone()?;
                self.upstream.browser_cdp_endpoint(&ctx.token, zone).await
            }
            ToolKind::Dataset(spec) => self.collect_dataset(ctx, spec, args, progress).await,
        }
    }

    async fn scrape(&self, ctx: &CallContext, url: &str, format: ScrapeFormat) -> Result<String> {
        check_http_url(url)?;
        let req = ScrapeRequest {
            url: url.trim().to_string(),
            zone: ctx.unlocker_zone.clone(),
            format,
        };
        self.upstream.scrape(&ctx.token, &req).await
    }

    async fn search(&self, ctx: &CallContext, a: &SearchEngineArgs) -> Result<String> {
        if a.query.trim().is_empty() {
            return Err(Error::InvalidParams("query: must be non-empty".to_string()));
        }
        let engine = a.engine.unwrap_or_default();
        let url = build_search_url(engine, &a.query, a.cursor.as_deref());
        self.scrape(ctx, &url, ScrapeFormat::Markdown).await
    }

    async fn search_batch(&self, ctx: &CallContext, queries: &[SearchEngineArgs]) -> Result<String> {
        check_batch_len("queries", queries.len())?;
        let results =
            futures::future::try_join_all(queries.iter().map(|q| self.search(ctx, q))).await?;
        let out: Vec<serde_json::Value> = queries
            .iter()
            .zip(results)
            .map(|(q, result)| {
                serde_json::json!({
                    "query": q.query,
                    "engine": q.engine.unwrap_or_default().as_str(),
                    "result": result,
                })
            })
            .collect();
        to_json_text(&serde_json::Value::Array(out))
    }

    async fn scrape_batch(&self, ctx: &CallContext, urls: &[String]) -> Result<String> {
        check_batch_len("urls", urls.len())?;
        let results = futures::future::try_join_all(
            urls.iter()
                .map(|u| self.scrape(ctx, u, ScrapeFormat::Markdown)),
        )
        .await?;
        let out: Vec<serde_json::Value> = urls
            .iter()
            .zip(results)
            .map(|(url, content)| serde_json::json!({ "url": url, "content": content }))
            .collect();
        to_json_text(&serde_json::Value::Array(out))
    }

    async fn collect_dataset(
        &self,
        ctx: &CallContext,
        spec: &DatasetSpec,
        args: &JsonObject,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<String> {
        let inputs = spec.build_inputs(args)?;
        let source = DatasetSource::new(&self.upstream, &ctx.token);
        let data = self
            .poller
            .collect(&source, spec.dataset_id, &inputs, progress)
            .await?;
        to_json_text(&data)
    }

    fn session_stats(&self) -> Result<String> {
        let usage = self.gate.usage();
        to_json_text(&serde_json::json!({
            "tool_calls": usage.tool_calls,
            "total_calls": usage.total_calls,
            "started_at_epoch_s": usage.started_at_epoch_s,
            "rate_limit": self.gate.config().map(|c| c.display.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: serde_json::Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn search_args_default_engine_and_reject_unknown_engines() {
        let a: SearchEngineArgs = parse_args(&obj(json!({"query": "rust"}))).unwrap();
        assert_eq!(a.engine.unwrap_or_default(), SearchEngine::Google);

        let err = parse_args::<SearchEngineArgs>(&obj(json!({"query": "x", "engine": "altavista"})))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected_by_every_argument_struct() {
        let extra = |v: serde_json::Value| {
            let mut o = obj(v);
            o.insert("surprise".to_string(), json!(true));
            o
        };
        assert!(parse_args::<SearchEngineArgs>(&extra(json!({"query": "q"}))).is_err());
        assert!(parse_args::<SearchBatchArgs>(&extra(json!({"queries": [{"query": "q"}]}))).is_err());
        assert!(parse_args::<ScrapeArgs>(&extra(json!({"url": "https://a.example/"}))).is_err());
        assert!(parse_args::<ScrapeBatchArgs>(&extra(json!({"urls": ["https://a.example/"]}))).is_err());
        assert!(parse_args::<EmptyArgs>(&extra(json!({}))).is_err());
        assert!(parse_args::<EmptyArgs>(&obj(json!({}))).is_ok());
    }

    #[test]
    fn missing_required_field_is_invalid_params() {
        let err = parse_args::<ScrapeArgs>(&obj(json!({}))).unwrap_err();
        assert!(err.to_string().contains("url"), "{err}");
    }

    #[test]
    fn batch_bounds() {
        assert!(check_batch_len("urls", 1).is_ok());
        assert!(check_batch_len("urls", MAX_BATCH).is_ok());
        assert!(check_batch_len("urls", 0).is_err());
        assert!(check_batch_len("urls", MAX_BATCH + 1).is_err());
    }
}
