// src/ingest/providers/sites.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::ingest::providers::html::{HtmlSiteFetcher, SiteProfile};
use crate::ingest::providers::pages::PageSource;
use crate::ingest::types::SourceFetcher;

pub static TECHCRUNCH: SiteProfile = SiteProfile {
    name: "TechCrunch",
    listing_url: "https://techcrunch.com/",
    origin: "https://techcrunch.com/",
    headline_selectors: &["h3 a"],
    link_must_contain: None,
    body_selectors: "div.article-content p, div.article__content p",
    placeholder_image: "https://picsum.photos/300/200?random=1",
};

pub static THE_VERGE: SiteProfile = SiteProfile {
    name: "The Verge",
    listing_url: "https://www.theverge.com/tech",
    origin: "https://www.theverge.com/",
    headline_selectors: &["article h2 a", "h2 a", "a[href*='/tech/']"],
    link_must_contain: Some("/tech/"),
    body_selectors: "div.duet--article--body p, div.c-entry-content p",
    placeholder_image: "https://picsum.photos/300/200?random=2",
};

pub static WIRED: SiteProfile = SiteProfile {
    name: "Wired",
    listing_url: "https://www.wired.com/",
    origin: "https://www.wired.com/",
    headline_selectors: &["h2 a"],
    link_must_contain: None,
    body_selectors: "div.body__inner-container p, article p, div.article__chunks p",
    placeholder_image: "https://picsum.photos/300/200?random=3",
};

/// Built-in registration order.
pub static ALL: [&SiteProfile; 3] = [&TECHCRUNCH, &THE_VERGE, &WIRED];

/// Case-insensitive lookup by display name ("the verge", "WIRED", ...).
pub fn profile_by_name(name: &str) -> Option<&'static SiteProfile> {
    ALL.iter()
        .copied()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

/// Build one fetcher per name, preserving the given order.
pub fn build_fetchers<P: PageSource>(
    names: &[String],
    pages: Arc<P>,
    pacing: Duration,
) -> Result<Vec<Arc<dyn SourceFetcher>>> {
    names
        .iter()
        .map(|n| {
            let profile = profile_by_name(n).ok_or_else(|| anyhow!("unknown source: {n}"))?;
            let fetcher = HtmlSiteFetcher::new(profile, Arc::clone(&pages))?.with_pacing(pacing);
            Ok(Arc::new(fetcher) as Arc<dyn SourceFetcher>)
        })
        .collect()
}
