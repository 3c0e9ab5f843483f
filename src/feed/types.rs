use serde::Deserialize;

/// Normalized listing handed to the pipeline (source-agnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Stable per real-world listing; used for de-duplication.
    pub identifier: String,
    /// Raw publication timestamp, e.g. "Wed, 02 Oct 2024 14:05:00 +0200".
    pub published: String,
}

/// RSS 2.0 document: `<rss><channel><item>...</item></channel></rss>`.
#[derive(Debug, Deserialize)]
pub struct Rss {
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    #[serde(rename = "item", default)]
    pub items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub guid: Option<Guid>,
    #[serde(rename = "pubDate", alias = "published")]
    pub pub_date: Option<String>,
}

/// `<guid isPermaLink="...">value</guid>`; the attribute is ignored.
#[derive(Debug, Deserialize)]
pub struct Guid {
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl RssItem {
    /// Convert to a listing. The identifier falls back to the link when the
    /// item has no usable guid; items with neither are dropped.
    pub fn into_listing(self) -> Option<ListingEntry> {
        let link = self.link.unwrap_or_default().trim().to_string();
        let identifier = self
            .guid
            .map(|g| g.value.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| link.clone());
        if identifier.is_empty() {
            return None;
        }
        Some(ListingEntry {
            title: self.title.unwrap_or_default().trim().to_string(),
            link,
            description: self.description.unwrap_or_default(),
            identifier,
            published: self.pub_date.unwrap_or_default().trim().to_string(),
        })
    }
}
