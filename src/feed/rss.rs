//! Project listings from an RSS 2.0 endpoint.

use super::types::{ListingEntry, Rss};
use super::ListingFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct RssFeed {
    client: Client,
    url: String,
}

impl RssFeed {
    pub fn new(url: &str, request_timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .context("failed to build feed HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ListingFeed for RssFeed {
    async fn fetch_listings(&self) -> Result<Vec<ListingEntry>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("feed request failed ({}): {}", status, self.url);
        }
        let body = resp.text().await.context("failed to read feed body")?;
        let listings = parse_listings(&body)?;
        tracing::info!(url = %self.url, count = listings.len(), "feed fetched");
        Ok(listings)
    }
}

/// Decode an RSS document into listings, preserving feed order.
pub fn parse_listings(xml: &str) -> Result<Vec<ListingEntry>> {
    let cleaned = scrub_html_entities(xml);
    let rss: Rss = quick_xml::de::from_str(&cleaned).context("parsing listing rss xml")?;

    let total = rss.channel.items.len();
    let listings: Vec<ListingEntry> = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| item.into_listing())
        .collect();
    if listings.len() < total {
        tracing::warn!(dropped = total - listings.len(), "feed items without guid or link");
    }
    Ok(listings)
}

/// Replace HTML entities that XML does not define.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&euro;", "€")
        .replace("&eacute;", "é")
        .replace("&egrave;", "è")
        .replace("&agrave;", "à")
        .replace("&ccedil;", "ç")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
}
