use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
    Bing,
    Yandex,
}

impl SearchEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::Yandex => "yandex",
        }
    }
}

/// Page number carried by the opaque pagination cursor; anything that is not
/// a non-negative integer means the first page.
pub fn page_from_cursor(cursor: Option<&str>) -> u32 {
    cursor
        .and_then(|c| c.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

fn encode(q: &str) -> String {
    url::form_urlencoded::byte_serialize(q.as_bytes()).collect()
}

/// Destination SERP URL for `engine`. Pure and deterministic.
pub fn build_search_url(engine: SearchEngine, query: &str, cursor: Option<&str>) -> String {
    let page = page_from_cursor(cursor);
    let start = u64::from(page) * 10;
    let q = encode(query);
    match engine {
        SearchEngine::Google => format!("https://www.google.com/search?q={q}&start={start}"),
        SearchEngine::Bing => format!("https://www.bing.com/search?q={q}&first={}", start + 1),
        SearchEngine::Yandex => format!("https://yandex.com/search/?text={q}&p={page}"),
    }
}
