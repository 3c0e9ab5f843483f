pub mod rss;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::ListingEntry;

#[async_trait]
pub trait ListingFeed: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<ListingEntry>>;
}
