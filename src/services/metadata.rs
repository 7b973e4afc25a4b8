// Metadata resolution - ranks provider results and picks a confident match

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::MetadataConfig;
use crate::models::{Candidate, MediaType, ParsedGuess, ResolvedMedia};
use crate::services::douban::DoubanClient;
use crate::services::provider::{MetadataProvider, SearchResult};
use crate::services::tmdb::TmdbClient;

const SIMILARITY_WEIGHT: f64 = 0.6;
const YEAR_WEIGHT: f64 = 0.25;
const TYPE_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub min_confidence: f64,
    pub request_timeout: Duration,
    pub fetch_episode_titles: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            request_timeout: Duration::from_secs(10),
            fetch_episode_titles: false,
        }
    }
}

/// Walks the configured providers in priority order until one yields a
/// candidate above the confidence threshold
pub struct MetadataResolver {
    providers: Vec<Arc<dyn MetadataProvider>>,
    settings: ResolverSettings,
}

impl MetadataResolver {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, settings: ResolverSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    /// Build the provider chain from `provider_priority`. Providers without
    /// credentials are left out entirely.
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();

        for name in &config.provider_priority {
            let provider: Arc<dyn MetadataProvider> = match name.trim().to_lowercase().as_str() {
                "tmdb" => Arc::new(TmdbClient::new(
                    config.tmdb_api_key.clone().unwrap_or_default(),
                    config.tmdb_language.clone(),
                    request_timeout,
                )?),
                "douban" => Arc::new(DoubanClient::new(
                    config.douban_cookie.clone().unwrap_or_default(),
                    request_timeout,
                )?),
                other => {
                    tracing::warn!("Ignoring unknown metadata provider '{}'", other);
                    continue;
                }
            };

            if !provider.is_available() {
                tracing::info!("Metadata provider {} disabled (no credentials)", provider.name());
                continue;
            }
            if providers.iter().any(|p| p.name() == provider.name()) {
                continue;
            }
            providers.push(provider);
        }

        Ok(Self::new(
            providers,
            ResolverSettings {
                min_confidence: config.min_confidence,
                request_timeout,
                fetch_episode_titles: config.fetch_episode_titles,
            },
        ))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Identify a parsed guess. `None` is the normal "no metadata" outcome.
    pub async fn resolve(&self, guess: &ParsedGuess) -> Option<ResolvedMedia> {
        let (provider, candidate) = match self.lookup_tagged(guess).await {
            Some(found) => found,
            None => self.search_providers(guess).await?,
        };

        let mut resolved = ResolvedMedia::new(candidate, guess);
        if self.settings.fetch_episode_titles {
            resolved.episode_title = self.fetch_episode_title(provider.as_ref(), &resolved).await;
        }

        Some(resolved)
    }

    /// Direct lookup for `{tmdbid=...}` / `{doubanid=...}` tags
    async fn lookup_tagged(
        &self,
        guess: &ParsedGuess,
    ) -> Option<(Arc<dyn MetadataProvider>, Candidate)> {
        let tags = [("tmdb", guess.tmdb_id), ("douban", guess.douban_id)];

        for (name, id) in tags {
            let Some(id) = id else { continue };
            let Some(provider) = self.providers.iter().find(|p| p.name() == name) else {
                tracing::debug!("Ignoring {} ID tag {}: provider not configured", name, id);
                continue;
            };

            match timeout(
                self.settings.request_timeout,
                provider.lookup(id, guess.media_type),
            )
            .await
            {
                Ok(Ok(Some(result))) => {
                    tracing::info!(
                        "Resolved '{}' by {} ID {} -> {} ({:?})",
                        guess.title,
                        name,
                        id,
                        result.title,
                        result.year
                    );
                    let candidate = to_candidate(provider.name(), result, 1.0);
                    return Some((provider.clone(), candidate));
                }
                Ok(Ok(None)) => tracing::debug!("{} has no entry for ID {}", name, id),
                Ok(Err(e)) => tracing::warn!("{} lookup failed for ID {}: {}", name, id, e),
                Err(_) => tracing::warn!("{} lookup timed out for ID {}", name, id),
            }
        }

        None
    }

    async fn search_providers(
        &self,
        guess: &ParsedGuess,
    ) -> Option<(Arc<dyn MetadataProvider>, Candidate)> {
        tracing::debug!(
            "Searching metadata for: {} ({:?}, {})",
            guess.title,
            guess.year,
            guess.media_type
        );

        for provider in &self.providers {
            let results = match timeout(
                self.settings.request_timeout,
                provider.search(&guess.title, guess.year, guess.media_type),
            )
            .await
            {
                Ok(Ok(results)) => results,
                Ok(Err(e)) => {
                    tracing::warn!("{} search failed for {}: {}", provider.name(), guess.title, e);
                    continue;
                }
                Err(_) => {
                    tracing::warn!("{} search timed out for {}", provider.name(), guess.title);
                    continue;
                }
            };

            let Some(best) = best_candidate(provider.name(), guess, results) else {
                tracing::debug!("No {} match for: {}", provider.name(), guess.title);
                continue;
            };

            if best.score < self.settings.min_confidence {
                tracing::debug!(
                    "Best {} match for '{}' is '{}' with score {:.2}, below threshold {:.2}",
                    provider.name(),
                    guess.title,
                    best.title,
                    best.score,
                    self.settings.min_confidence
                );
                continue;
            }

            tracing::info!(
                "Found {} match for '{}': {} ({:?}) score {:.2}",
                provider.name(),
                guess.title,
                best.title,
                best.year,
                best.score
            );
            return Some((provider.clone(), best));
        }

        None
    }

    async fn fetch_episode_title(
        &self,
        provider: &dyn MetadataProvider,
        resolved: &ResolvedMedia,
    ) -> Option<String> {
        if resolved.media_type() != MediaType::Tv {
            return None;
        }
        let (season, episode) = (resolved.season?, resolved.episode?);

        match timeout(
            self.settings.request_timeout,
            provider.episode_title(resolved.candidate.provider_id, season, episode),
        )
        .await
        {
            Ok(Ok(title)) => title,
            Ok(Err(e)) => {
                tracing::debug!("Episode title lookup failed: {}", e);
                None
            }
            Err(_) => {
                tracing::debug!("Episode title lookup timed out");
                None
            }
        }
    }
}

fn to_candidate(provider: &str, result: SearchResult, score: f64) -> Candidate {
    Candidate {
        provider: provider.to_string(),
        provider_id: result.id,
        title: result.title,
        original_title: result.original_title,
        year: result.year,
        media_type: result.media_type,
        score,
    }
}

/// Highest-scoring candidate; ties keep the earliest result
pub fn best_candidate(
    provider: &str,
    guess: &ParsedGuess,
    results: Vec<SearchResult>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for result in results {
        let score = score_result(guess, &result);
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(to_candidate(provider, result, score));
        }
    }

    best
}

/// Weighted relevance in [0, 1]: title similarity, year and media type
pub fn score_result(guess: &ParsedGuess, result: &SearchResult) -> f64 {
    let title_score = result
        .original_title
        .as_deref()
        .map(|original| string_similarity(&guess.title, original))
        .unwrap_or(0.0)
        .max(string_similarity(&guess.title, &result.title));

    let year_score = match (guess.year, result.year) {
        (Some(a), Some(b)) if a == b => 1.0,
        (Some(a), Some(b)) if (a - b).abs() == 1 => 0.5,
        (Some(_), Some(_)) => 0.0,
        _ => 0.5,
    };

    let type_score = match (guess.media_type, result.media_type) {
        (MediaType::Unknown, _) | (_, MediaType::Unknown) => 0.5,
        (a, b) if a == b => 1.0,
        _ => 0.0,
    };

    SIMILARITY_WEIGHT * title_score + YEAR_WEIGHT * year_score + TYPE_WEIGHT * type_score
}

/// Normalized token-set overlap (Jaccard). CJK characters count as
/// individual tokens so unsegmented titles still compare.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);

    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    if ta == tb {
        return 1.0;
    }

    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;

    intersection / union
}

fn tokenize(s: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();

    for c in s.chars().flat_map(char::to_lowercase) {
        if is_cjk(c) {
            if !current.is_empty() {
                tokens.insert(std::mem::take(&mut current));
            }
            tokens.insert(c.to_string());
        } else if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            tokens.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.insert(current);
    }

    tokens
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{AC00}'..='\u{D7AF}')
}
