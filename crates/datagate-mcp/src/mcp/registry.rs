//! Tool catalogue: every tool is a data record built by one constructor, and
//! the dispatcher matches on [`ToolKind`].

use super::tools::{EmptyArgs, ScrapeArgs, ScrapeBatchArgs, SearchBatchArgs, SearchEngineArgs};
use datagate_core::catalog::{DatasetSpec, DATASETS};
use datagate_core::ScrapeFormat;
use rmcp::model::{JsonObject, Tool};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Toolset {
    Slim,
    #[default]
    Full,
}

impl Toolset {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Slim => "slim",
            Self::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ToolKind {
    SearchEngine,
    SearchEngineBatch,
    Scrape(ScrapeFormat),
    ScrapeBatch,
    SessionStats,
    BrowserEndpoint,
    Dataset(&'static DatasetSpec),
}

impl ToolKind {
    /// Tools that cannot run without a browser zone.
    pub(crate) fn needs_browser(self) -> bool {
        matches!(self, Self::BrowserEndpoint)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ToolDef {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) schema: Arc<JsonObject>,
    pub(crate) kind: ToolKind,
    pub(crate) slim: bool,
}

impl ToolDef {
    fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: JsonObject,
        kind: ToolKind,
        slim: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: Arc::new(schema),
            kind,
            slim,
        }
    }

    pub(crate) fn to_tool(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            self.schema.clone(),
        )
    }
}

fn schema_of<T: schemars::JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(m)) => m,
        _ => {
            let mut m = JsonObject::new();
            m.insert("type".to_string(), serde_json::json!("object"));
            m
        }
    }
}

struct BaseTool {
    name: &'static str,
    description: &'static str,
    schema: fn() -> JsonObject,
    kind: ToolKind,
    slim: bool,
}

const BASE_TOOLS: &[BaseTool] = &[
    BaseTool {
        name: "search_engine",
        description: "Scrape search results from Google, Bing or Yandex. Returns the SERP as markdown. \
            Pass the page number as `cursor` to paginate.",
        schema: schema_of::<SearchEngineArgs>,
        kind: ToolKind::SearchEngine,
        slim: true,
    },
    BaseTool {
        name: "search_engine_batch",
        description: "Run up to 10 searches concurrently. Returns a JSON array of {query, engine, result}.",
        schema: schema_of::<SearchBatchArgs>,
        kind: ToolKind::SearchEngineBatch,
        slim: true,
    },
    BaseTool {
        name: "scrape_as_markdown",
        description: "Fetch a single web page through the unlocker zone (bypasses bot detection and \
            CAPTCHA) and return it as markdown.",
        schema: schema_of::<ScrapeArgs>,
        kind: ToolKind::Scrape(ScrapeFormat::Markdown),
        slim: true,
    },
    BaseTool {
        name: "scrape_as_html",
        description: "Fetch a single web page through the unlocker zone and return the raw HTML.",
        schema: schema_of::<ScrapeArgs>,
        kind: ToolKind::Scrape(ScrapeFormat::Html),
        slim: false,
    },
    BaseTool {
        name: "scrape_batch",
        description: "Fetch up to 10 pages concurrently as markdown. Returns a JSON array of {url, content}.",
        schema: schema_of::<ScrapeBatchArgs>,
        kind: ToolKind::ScrapeBatch,
        slim: true,
    },
    BaseTool {
        name: "session_stats",
        description: "Report how many times each tool has been called since the server started.",
        schema: schema_of::<EmptyArgs>,
        kind: ToolKind::SessionStats,
        slim: true,
    },
    BaseTool {
        name: "browser_cdp_endpoint",
        description: "Resolve the remote-browser (CDP) websocket endpoint for this session's browser \
            zone. Connect a CDP client to it to drive a real browser.",
        schema: schema_of::<EmptyArgs>,
        kind: ToolKind::BrowserEndpoint,
        slim: false,
    },
];

fn dataset_tool(spec: &'static DatasetSpec) -> ToolDef {
    ToolDef::new(
        spec.tool_name(),
        format!(
            "{} This can be a cache lookup, so it can be more reliable than scraping.",
            spec.description
        ),
        spec.input_schema(),
        ToolKind::Dataset(spec),
        false,
    )
}

/// Immutable after construction; shared by every connection.
#[derive(Debug)]
pub(crate) struct ToolRegistry {
    toolset: Toolset,
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    pub(crate) fn new(toolset: Toolset) -> Self {
        let all = BASE_TOOLS
            .iter()
            .map(|b| ToolDef::new(b.name, b.description, (b.schema)(), b.kind, b.slim))
            .chain(DATASETS.iter().map(dataset_tool));
        let tools = all
            .filter(|t| toolset == Toolset::Full || t.slim)
            .collect();
        Self { toolset, tools }
    }

    pub(crate) fn toolset(&self) -> Toolset {
        self.toolset
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub(crate) fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub(crate) fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDef::to_tool).collect()
    }
}
