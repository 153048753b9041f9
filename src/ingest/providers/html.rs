// src/ingest/providers/html.rs
//! Profile-driven scraper: listing page -> headline candidates -> article pages.
//!
//! `scraper::Html` is not `Send`, so every parse happens inside a plain fn and
//! only owned strings cross an `.await`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::ingest::normalize_text;
use crate::ingest::providers::pages::PageSource;
use crate::ingest::types::{link_is_under, Article, SourceFetcher, CONTENT_UNAVAILABLE};

/// Static description of one news site.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    pub listing_url: &'static str,
    /// Site root; article links must live below it.
    pub origin: &'static str,
    /// Tried in order; the first selector yielding any valid headline wins.
    pub headline_selectors: &'static [&'static str],
    pub link_must_contain: Option<&'static str>,
    /// Comma-separated paragraph selectors; falls back to every `<p>`.
    pub body_selectors: &'static str,
    pub placeholder_image: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    title: String,
    link: String,
    image: String,
}

pub struct HtmlSiteFetcher<P: PageSource> {
    profile: &'static SiteProfile,
    origin: Url,
    pages: Arc<P>,
    pacing: Duration,
}

impl<P: PageSource> HtmlSiteFetcher<P> {
    pub fn new(profile: &'static SiteProfile, pages: Arc<P>) -> Result<Self> {
        let origin = Url::parse(profile.origin)
            .with_context(|| format!("origin of {} is not a URL", profile.name))?;
        Ok(Self {
            profile,
            origin,
            pages,
            pacing: Duration::ZERO,
        })
    }

    /// Delay between article-page requests (courtesy to the remote site).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    fn extract_candidates(&self, html: &str) -> Result<Vec<Candidate>> {
        let doc = Html::parse_document(html);
        let og_image = doc
            .select(&parse_selector(r#"meta[property="og:image"]"#)?)
            .next()
            .and_then(|m| m.value().attr("content"))
            .and_then(|c| self.resolve(c));
        let img = parse_selector("img[src]")?;

        for raw in self.profile.headline_selectors {
            let sel = parse_selector(raw)?;
            let mut seen = HashSet::new();
            let mut out = Vec::new();

            for el in doc.select(&sel) {
                let title = normalize_text(&el.text().collect::<String>());
                let Some(link) = el.value().attr("href").and_then(|h| self.resolve(h)) else {
                    continue;
                };
                if title.is_empty() || !link_is_under(&link, &self.origin) {
                    continue;
                }
                if let Some(needle) = self.profile.link_must_contain {
                    if !link.contains(needle) {
                        continue;
                    }
                }
                if !seen.insert(link.clone()) {
                    continue;
                }
                let image = self
                    .card_image(el, &img)
                    .or_else(|| og_image.clone())
                    .unwrap_or_else(|| self.profile.placeholder_image.to_string());
                out.push(Candidate { title, link, image });
            }

            if !out.is_empty() {
                tracing::debug!(target: "ingest", source = self.profile.name, selector = *raw, found = out.len(), "headlines matched");
                return Ok(out);
            }
        }
        Ok(Vec::new())
    }

    /// First `<img src>` inside the headline's enclosing `<article>`.
    fn card_image(&self, el: ElementRef<'_>, img: &Selector) -> Option<String> {
        let card = el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "article")?;
        card.select(img)
            .filter_map(|i| i.value().attr("src"))
            .find_map(|src| self.resolve(src))
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.origin.join(href).ok().map(String::from)
    }

    async fn fetch_content(&self, link: &str) -> String {
        let body = match self.pages.get_text(link).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "ingest", source = self.profile.name, %link, error = %format!("{e:#}"), "article page unavailable");
                return CONTENT_UNAVAILABLE.to_string();
            }
        };
        match extract_body(&body, self.profile.body_selectors) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => CONTENT_UNAVAILABLE.to_string(),
            Err(e) => {
                tracing::warn!(target: "ingest", source = self.profile.name, %link, error = %e, "article body not parsed");
                CONTENT_UNAVAILABLE.to_string()
            }
        }
    }
}

#[async_trait]
impl<P: PageSource> SourceFetcher for HtmlSiteFetcher<P> {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let listing = self
            .pages
            .get_text(self.profile.listing_url)
            .await
            .with_context(|| format!("{} listing", self.profile.name))?;
        let candidates = self.extract_candidates(&listing)?;

        let mut out = Vec::with_capacity(candidates.len());
        for (i, c) in candidates.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            let content = self.fetch_content(&c.link).await;
            out.push(Article {
                source: self.profile.name.to_string(),
                title: c.title,
                link: c.link,
                content,
                image: c.image,
                fetched_at: Utc::now(),
            });
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        self.profile.name
    }
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| anyhow!("invalid selector {raw:?}: {e}"))
}

/// Join the text of the body paragraphs; every `<p>` when the site selectors miss.
fn extract_body(html: &str, selectors: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let paragraphs = |sel: &Selector| {
        doc.select(sel)
            .map(|p| normalize_text(&p.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
    };
    let mut parts = paragraphs(&parse_selector(selectors)?);
    if parts.is_empty() {
        parts = paragraphs(&parse_selector("p")?);
    }
    Ok(parts.join(" "))
}
