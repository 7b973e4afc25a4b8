//! Common capability implemented by every metadata backend.
//!
//! The resolver holds providers as an ordered list of
//! `Arc<dyn MetadataProvider>` and walks it in priority order.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::MediaType;

/// A single raw result returned by a provider search or lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-specific numeric identifier
    pub id: i64,
    /// Localised display title
    pub title: String,
    /// Original-language title, if the provider reports one
    pub original_title: Option<String>,
    /// Release or premiere year
    pub year: Option<i32>,
    pub media_type: MediaType,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short lowercase identifier (e.g. `"tmdb"`), also used in priority lists
    fn name(&self) -> &'static str;

    /// `false` when credentials are missing; the resolver skips the provider
    fn is_available(&self) -> bool;

    /// Search by title. `media_type` of `Unknown` searches every kind the
    /// provider supports. Results keep the provider's own ordering.
    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Result<Vec<SearchResult>>;

    /// Fetch a single item by its provider ID
    async fn lookup(&self, id: i64, media_type: MediaType) -> Result<Option<SearchResult>>;

    /// Episode title for a TV item, when the provider can supply one
    async fn episode_title(&self, _id: i64, _season: i32, _episode: i32) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Year from an ISO date ("2023-05-01") or a bare year string
pub fn year_from_date(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.trim().parse().ok())
}
