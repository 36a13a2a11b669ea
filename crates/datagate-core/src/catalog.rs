//! Structured-dataset tools as data.
//!
//! Each [`DatasetSpec`] becomes one `web_data_<name>` tool. The MCP layer
//! registers them all through the same constructor; nothing here is
//! hand-written per tool.

use crate::{Error, Result};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Absolute http(s) URL.
    Url,
    /// Digits only; sent upstream as a string.
    Number,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    /// Optional fields carry a default; fields without one are required.
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            default: None,
        }
    }

    const fn optional(
        name: &'static str,
        kind: FieldKind,
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            default: Some(default),
        }
    }

    fn schema(&self) -> Value {
        let mut s = match self.kind {
            FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Url => json!({ "type": "string", "format": "uri" }),
            FieldKind::Number => json!({ "type": "string", "pattern": "^[0-9]+$" }),
        };
        s["description"] = json!(self.description);
        if let Some(d) = self.default {
            s["default"] = json!(d);
        }
        s
    }

    fn check(&self, value: &str) -> Result<()> {
        let bad = |why: &str| Error::InvalidParams(format!("{}: {why}", self.name));
        match self.kind {
            FieldKind::Text => {
                if value.trim().is_empty() {
                    return Err(bad("must be non-empty"));
                }
            }
            FieldKind::Url => check_http_url(value).map_err(|_| bad("must be an http(s) URL"))?,
            FieldKind::Number => {
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(bad("must be a non-negative integer"));
                }
            }
        }
        Ok(())
    }
}

/// Accept only absolute http/https URLs.
pub fn check_http_url(raw: &str) -> Result<()> {
    let u = url::Url::parse(raw.trim())
        .map_err(|e| Error::InvalidParams(format!("invalid url {raw:?}: {e}")))?;
    match u.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidParams(format!(
            "invalid url {raw:?}: unsupported scheme {other}"
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    /// Suffix of the tool name (`web_data_<name>`).
    pub name: &'static str,
    pub dataset_id: &'static str,
    pub description: &'static str,
    pub inputs: &'static [FieldSpec],
}

pub const DATASET_TOOL_PREFIX: &str = "web_data_";

impl DatasetSpec {
    pub fn tool_name(&self) -> String {
        format!("{DATASET_TOOL_PREFIX}{}", self.name)
    }

    /// JSON Schema object for the tool's arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut props = Map::new();
        let mut required = Vec::new();
        for f in self.inputs {
            props.insert(f.name.to_string(), f.schema());
            if f.default.is_none() {
                required.push(f.name);
            }
        }
        let mut m = Map::new();
        m.insert("type".to_string(), json!("object"));
        m.insert("properties".to_string(), Value::Object(props));
        m.insert("required".to_string(), json!(required));
        m
    }

    /// Validate caller arguments and fill defaults. Unknown keys are dropped.
    pub fn build_inputs(&self, args: &Map<String, Value>) -> Result<Value> {
        let mut out = Map::new();
        for f in self.inputs {
            let value = match args.get(f.name) {
                None | Some(Value::Null) => match f.default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(Error::InvalidParams(format!("{}: required", f.name)));
                    }
                },
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) if f.kind == FieldKind::Number => n.to_string(),
                Some(other) => {
                    return Err(Error::InvalidParams(format!(
                        "{}: expected a string, got {other}",
                        f.name
                    )));
                }
            };
            f.check(&value)?;
            out.insert(f.name.to_string(), Value::String(value));
        }
        Ok(Value::Object(out))
    }
}

const URL_ONLY: &[FieldSpec] = &[FieldSpec::required(
    "url",
    FieldKind::Url,
    "Page URL to collect",
)];

pub static DATASETS: &[DatasetSpec] = &[
    DatasetSpec {
        name: "amazon_product",
        dataset_id: "gd_l7q7dkf244hwjntr0",
        description: "Quickly read structured amazon product data. Requires a valid product URL with /dp/ in it.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "amazon_product_reviews",
        dataset_id: "gd_le8e811kzy4ggddlq",
        description: "Quickly read structured amazon product review data. Requires a valid product URL with /dp/ in it.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "amazon_product_search",
        dataset_id: "gd_lwdb4vjm1ehb499uxs",
        description: "Structured amazon search results for a keyword on a given amazon domain URL.",
        inputs: &[
            FieldSpec::required("keyword", FieldKind::Text, "Search keyword"),
            FieldSpec::required("url", FieldKind::Url, "Amazon domain URL, e.g. https://www.amazon.com"),
            FieldSpec::optional("pages_to_search", FieldKind::Number, "Result pages to collect", "1"),
        ],
    },
    DatasetSpec {
        name: "linkedin_person_profile",
        dataset_id: "gd_l1viktl72bvl7bjuj0",
        description: "Quickly read structured linkedin people profile data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "linkedin_company_profile",
        dataset_id: "gd_l1vikfnt1wgvvqz95w",
        description: "Quickly read structured linkedin company profile data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "linkedin_people_search",
        dataset_id: "gd_m8d03he47z8nwb5xc",
        description: "Structured linkedin people search results by name.",
        inputs: &[
            FieldSpec::required("url", FieldKind::Url, "LinkedIn search base URL"),
            FieldSpec::required("first_name", FieldKind::Text, "First name"),
            FieldSpec::required("last_name", FieldKind::Text, "Last name"),
        ],
    },
    DatasetSpec {
        name: "zoominfo_company_profile",
        dataset_id: "gd_m0ci4a4ivx3j5l6nx",
        description: "Quickly read structured ZoomInfo company profile data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "instagram_profiles",
        dataset_id: "gd_l1vikfch901nx3by4",
        description: "Quickly read structured Instagram profile data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "instagram_posts",
        dataset_id: "gd_lk5ns7kz21pck8jpis",
        description: "Quickly read structured Instagram post data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "facebook_posts",
        dataset_id: "gd_lyclm1571iy3mv57zw",
        description: "Quickly read structured Facebook post data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "x_posts",
        dataset_id: "gd_lwxkxvnf1cynvib9co",
        description: "Quickly read structured X post data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "tiktok_profiles",
        dataset_id: "gd_l1villgoiiidt09ci",
        description: "Quickly read structured TikTok profile data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "youtube_videos",
        dataset_id: "gd_lk56epmy2i5g7lzu0k",
        description: "Quickly read structured YouTube video data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "youtube_comments",
        dataset_id: "gd_lk9q0ew71spt1mxywf",
        description: "Quickly read structured YouTube comments data.",
        inputs: &[
            FieldSpec::required("url", FieldKind::Url, "Video URL"),
            FieldSpec::optional("num_of_comments", FieldKind::Number, "Number of comments to collect", "10"),
        ],
    },
    DatasetSpec {
        name: "reddit_posts",
        dataset_id: "gd_lvz8ah06191smkebj4",
        description: "Quickly read structured Reddit post data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "google_maps_reviews",
        dataset_id: "gd_luzfs1dn2oa0teb81",
        description: "Quickly read structured Google Maps reviews data.",
        inputs: &[
            FieldSpec::required("url", FieldKind::Url, "Google Maps place URL"),
            FieldSpec::optional("days_limit", FieldKind::Number, "Only reviews from the last N days", "3"),
        ],
    },
    DatasetSpec {
        name: "google_play_store",
        dataset_id: "gd_lsk382l8xei8vzm4u",
        description: "Quickly read structured Google Play Store app data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "zillow_properties_listing",
        dataset_id: "gd_lfqkr8wm13ixtbd8f5",
        description: "Quickly read structured Zillow property listing data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "booking_hotel_listings",
        dataset_id: "gd_m5mbdl081229ln6t4a",
        description: "Quickly read structured Booking.com hotel listing data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "crunchbase_company",
        dataset_id: "gd_l1vijqt9jfj7olije",
        description: "Quickly read structured Crunchbase company data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "github_repository_file",
        dataset_id: "gd_lyrexgxc24b3d4imjt",
        description: "Quickly read structured GitHub repository file data.",
        inputs: URL_ONLY,
    },
    DatasetSpec {
        name: "reuter_news",
        dataset_id: "gd_lyptx9h74wtlvpnfu",
        description: "Quickly read structured Reuters news data.",
        inputs: URL_ONLY,
    },
];

pub fn dataset(tool_name: &str) -> Option<&'static DatasetSpec> {
    let name = tool_name.strip_prefix(DATASET_TOOL_PREFIX)?;
    DATASETS.iter().find(|d| d.name == name)
}
