// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use url::Url;

/// Body text used when an article page could not be fetched or had no paragraphs.
pub const CONTENT_UNAVAILABLE: &str = "Full content could not be loaded.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: String, // e.g., "TechCrunch", "The Verge"
    pub title: String,
    pub link: String,    // absolute, under the source's own origin
    pub content: String, // never empty; CONTENT_UNAVAILABLE when missing
    pub image: String,   // absolute; per-source placeholder as last resort
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// True when `link` parses as an absolute http(s) URL on the same host as
    /// `origin` and below its path.
    pub fn is_under(&self, origin: &Url) -> bool {
        link_is_under(&self.link, origin)
    }
}

pub(crate) fn link_is_under(link: &str, origin: &Url) -> bool {
    let Ok(parsed) = Url::parse(link) else {
        return false;
    };
    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str() == origin.host_str()
        && parsed.path().starts_with(origin.path())
}

/// One aggregation result. `articles` is grouped by source in registration order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    #[serde(default)]
    pub articles: Vec<Article>,
    pub generated_at: DateTime<Utc>,
}

impl Feed {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            articles: Vec::new(),
            generated_at,
        }
    }
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
