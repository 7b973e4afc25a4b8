// TMDB metadata provider service
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::models::MediaType;
use crate::services::provider::{year_from_date, MetadataProvider, SearchResult};

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    api_key: String,
    language: String,
    base_url: String,
}

/// Search result for TV shows
#[derive(Debug, Deserialize)]
pub struct TvSearchResults {
    pub results: Vec<TvSearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct TvSearchResult {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
}

impl From<TvSearchResult> for SearchResult {
    fn from(r: TvSearchResult) -> Self {
        SearchResult {
            id: r.id,
            year: year_from_date(r.first_air_date.as_deref()),
            title: r.name,
            original_title: r.original_name,
            media_type: MediaType::Tv,
        }
    }
}

/// Search result for movies
#[derive(Debug, Deserialize)]
pub struct MovieSearchResults {
    pub results: Vec<MovieSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieSearchResult {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
}

impl From<MovieSearchResult> for SearchResult {
    fn from(r: MovieSearchResult) -> Self {
        SearchResult {
            id: r.id,
            year: year_from_date(r.release_date.as_deref()),
            title: r.title,
            original_title: r.original_title,
            media_type: MediaType::Movie,
        }
    }
}

/// Season details
#[derive(Debug, Deserialize)]
pub struct SeasonDetails {
    pub season_number: i32,
    pub episodes: Option<Vec<EpisodeInfo>>,
}

/// Episode info from season details
#[derive(Debug, Deserialize)]
pub struct EpisodeInfo {
    pub name: String,
    pub episode_number: i32,
}

impl TmdbClient {
    /// Create a new TMDB client
    pub fn new(api_key: String, language: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build TMDB HTTP client")?;

        Ok(Self {
            client,
            api_key,
            language,
            base_url: TMDB_API_BASE.to_string(),
        })
    }

    /// Point the client at another API root (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request TMDB {}", what))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .error_for_status()
            .with_context(|| format!("TMDB {} request rejected", what))?
            .json()
            .await
            .with_context(|| format!("Failed to parse TMDB {} response", what))?;

        Ok(Some(body))
    }

    /// Search for TV shows by name
    pub async fn search_tv(&self, query: &str, year: Option<i32>) -> Result<Vec<TvSearchResult>> {
        let mut url = format!(
            "{}/search/tv?api_key={}&language={}&query={}&include_adult=false",
            self.base_url,
            self.api_key,
            self.language,
            urlencoding::encode(query)
        );

        if let Some(y) = year {
            url.push_str(&format!("&first_air_date_year={}", y));
        }

        let response: Option<TvSearchResults> = self.get_json(&url, "TV search").await?;
        Ok(response.map(|r| r.results).unwrap_or_default())
    }

    /// Search for movies by name
    pub async fn search_movie(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieSearchResult>> {
        let mut url = format!(
            "{}/search/movie?api_key={}&language={}&query={}&include_adult=false",
            self.base_url,
            self.api_key,
            self.language,
            urlencoding::encode(query)
        );

        if let Some(y) = year {
            url.push_str(&format!("&year={}", y));
        }

        let response: Option<MovieSearchResults> = self.get_json(&url, "movie search").await?;
        Ok(response.map(|r| r.results).unwrap_or_default())
    }

    /// Get basic TV show info by ID
    pub async fn get_tv_details(&self, tmdb_id: i64) -> Result<Option<TvSearchResult>> {
        let url = format!(
            "{}/tv/{}?api_key={}&language={}",
            self.base_url, tmdb_id, self.api_key, self.language
        );
        self.get_json(&url, "TV details").await
    }

    /// Get basic movie info by ID
    pub async fn get_movie_details(&self, tmdb_id: i64) -> Result<Option<MovieSearchResult>> {
        let url = format!(
            "{}/movie/{}?api_key={}&language={}",
            self.base_url, tmdb_id, self.api_key, self.language
        );
        self.get_json(&url, "movie details").await
    }

    /// Get season details including episode list
    pub async fn get_season_details(
        &self,
        tv_id: i64,
        season_number: i32,
    ) -> Result<Option<SeasonDetails>> {
        let url = format!(
            "{}/tv/{}/season/{}?api_key={}&language={}",
            self.base_url, tv_id, season_number, self.api_key, self.language
        );
        self.get_json(&url, "season details").await
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(
        &self,
        title: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();

        if media_type != MediaType::Tv {
            let movies = self.search_movie(title, year).await?;
            results.extend(movies.into_iter().map(SearchResult::from));
        }
        if media_type != MediaType::Movie {
            let shows = self.search_tv(title, year).await?;
            results.extend(shows.into_iter().map(SearchResult::from));
        }

        tracing::debug!(
            "TMDB search '{}' ({:?}, {}) returned {} results",
            title,
            year,
            media_type,
            results.len()
        );

        Ok(results)
    }

    async fn lookup(&self, id: i64, media_type: MediaType) -> Result<Option<SearchResult>> {
        if media_type != MediaType::Tv {
            if let Some(movie) = self.get_movie_details(id).await? {
                return Ok(Some(movie.into()));
            }
        }
        if media_type != MediaType::Movie {
            if let Some(show) = self.get_tv_details(id).await? {
                return Ok(Some(show.into()));
            }
        }
        Ok(None)
    }

    async fn episode_title(&self, id: i64, season: i32, episode: i32) -> Result<Option<String>> {
        let Some(details) = self.get_season_details(id, season).await? else {
            return Ok(None);
        };

        Ok(details
            .episodes
            .unwrap_or_default()
            .into_iter()
            .find(|e| e.episode_number == episode)
            .map(|e| e.name)
            .filter(|name| !name.trim().is_empty()))
    }
}
