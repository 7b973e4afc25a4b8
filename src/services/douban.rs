// Douban metadata provider (frodo mobile API)
// Requests need a logged-in cookie; without one the provider reports itself unavailable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::models::MediaType;
use crate::services::provider::{year_from_date, MetadataProvider, SearchResult};

pub const DOUBAN_API_BASE: &str = "https://frodo.douban.com/api/v2";

const USER_AGENT: &str = "Mozilla/5.0";

pub struct DoubanClient {
    client: Client,
    cookie: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    subjects: Vec<SearchItem>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Search entries come either flat or wrapped in a `target` object
#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<IdValue>,
    target_id: Option<IdValue>,
    target_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    original_title: Option<String>,
    year: Option<IdValue>,
    target: Option<Subject>,
}

#[derive(Debug, Deserialize)]
struct Subject {
    id: Option<IdValue>,
    title: Option<String>,
    original_title: Option<String>,
    year: Option<IdValue>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Douban mixes numeric and string encodings for IDs and years
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Int(i64),
    Str(String),
}

impl IdValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            IdValue::Int(n) => Some(*n),
            IdValue::Str(s) => s.trim().parse().ok(),
        }
    }

    fn as_year(&self) -> Option<i32> {
        match self {
            IdValue::Int(n) => i32::try_from(*n).ok(),
            IdValue::Str(s) => year_from_date(Some(s)),
        }
    }
}

fn media_type_of(kind: Option<&str>) -> MediaType {
    match kind {
        Some("movie") => MediaType::Movie,
        Some("tv") => MediaType::Tv,
        _ => MediaType::Unknown,
    }
}

impl SearchItem {
    fn into_result(self) -> Option<SearchResult> {
        let target = self.target;
        let id = self
            .target_id
            .as_ref()
            .or(self.id.as_ref())
            .or(target.as_ref().and_then(|t| t.id.as_ref()))
            .and_then(IdValue::as_i64)?;
        let title = self
            .title
            .or_else(|| target.as_ref().and_then(|t| t.title.clone()))?;
        let original_title = self
            .original_title
            .or_else(|| target.as_ref().and_then(|t| t.original_title.clone()))
            .filter(|t| !t.is_empty());
        let year = self
            .year
            .as_ref()
            .or(target.as_ref().and_then(|t| t.year.as_ref()))
            .and_then(IdValue::as_year);
        let kind = self
            .target_type
            .or(self.kind)
            .or_else(|| target.as_ref().and_then(|t| t.kind.clone()));

        Some(SearchResult {
            id,
            title,
            original_title,
            year,
            media_type: media_type_of(kind.as_deref()),
        })
    }
}

impl DoubanClient {
    pub fn new(cookie: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build Douban HTTP client")?;

        Ok(Self {
            client,
            cookie,
            base_url: DOUBAN_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn search_items(&self, query: &str) -> Result<Vec<SearchItem>> {
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(query));

        let response: SearchResponse = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .context("Failed to search Douban")?
            .error_for_status()
            .context("Douban search request rejected")?
            .json()
            .await
            .context("Failed to parse Douban search response")?;

        let mut items = response.subjects;
        items.extend(response.items);
        Ok(items)
    }

    async fn get_subject(&self, kind: &str, id: i64) -> Result<Option<SearchResult>> {
        let url = format!("{}/{}/{}", self.base_url, kind, id);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .context("Failed to get Douban subject")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let subject: Subject = response
            .error_for_status()
            .context("Douban subject request rejected")?
            .json()
            .await
            .context("Failed to parse Douban subject response")?;

        let Some(title) = subject.title else {
            return Ok(None);
        };

        Ok(Some(SearchResult {
            id: subject.id.as_ref().and_then(IdValue::as_i64).unwrap_or(id),
            title,
            original_title: subject.original_title.filter(|t| !t.is_empty()),
            year: subject.year.as_ref().and_then(IdValue::as_year),
            media_type: media_type_of(subject.kind.as_deref().or(Some(kind))),
        }))
    }
}

#[async_trait]
impl MetadataProvider for DoubanClient {
    fn name(&self) -> &'static str {
        "douban"
    }

    fn is_available(&self) -> bool {
        !self.cookie.trim().is_empty()
    }

    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Result<Vec<SearchResult>> {
        let query = match year {
            Some(y) => format!("{} {}", title, y),
            None => title.to_string(),
        };

        let results: Vec<SearchResult> = self
            .search_items(&query)
            .await?
            .into_iter()
            .filter_map(SearchItem::into_result)
            .filter(|r| {
                media_type == MediaType::Unknown
                    || r.media_type == MediaType::Unknown
                    || r.media_type == media_type
            })
            .collect();

        tracing::debug!("Douban search '{}' returned {} results", query, results.len());

        Ok(results)
    }

    async fn lookup(&self, id: i64, media_type: MediaType) -> Result<Option<SearchResult>> {
        if media_type != MediaType::Tv {
            if let Some(found) = self.get_subject("movie", id).await? {
                return Ok(Some(found));
            }
        }
        if media_type != MediaType::Movie {
            return self.get_subject("tv", id).await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DoubanClient {
        DoubanClient::new("bid=abc".into(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_unavailable_without_cookie() {
        let client = DoubanClient::new(String::new(), Duration::from_secs(5)).unwrap();
        assert!(!client.is_available());
    }

    #[tokio::test]
    async fn test_search_parses_both_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "流浪地球 2019"))
            .and(header("cookie", "bid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"target_id": "26266893", "target_type": "movie",
                     "target": {"title": "流浪地球", "year": "2019"}},
                    {"id": 30000001, "title": "流浪地球 剧集", "type": "tv", "year": 2020}
                ]
            })))
            .mount(&server)
            .await;

        let results = client(&server)
            .search("流浪地球", Some(2019), MediaType::Movie)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 26266893);
        assert_eq!(results[0].title, "流浪地球");
        assert_eq!(results[0].year, Some(2019));
        assert_eq!(results[0].media_type, MediaType::Movie);
    }

    #[tokio::test]
    async fn test_lookup_movie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/1292052"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1292052", "title": "肖申克的救赎",
                "original_title": "The Shawshank Redemption", "year": "1994", "type": "movie"
            })))
            .mount(&server)
            .await;

        let found = client(&server)
            .lookup(1292052, MediaType::Movie)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.title, "肖申克的救赎");
        assert_eq!(found.original_title.as_deref(), Some("The Shawshank Redemption"));
        assert_eq!(found.year, Some(1994));
    }
}
