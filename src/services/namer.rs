// Name rendering - turns a resolved identification into a relative target path

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::models::{MediaType, ParsedGuess, RawInput, ResolvedMedia};

pub const DEFAULT_MOVIE_TEMPLATE: &str = "{title} ({year})";
pub const DEFAULT_TV_TEMPLATE: &str = "{title} ({year})/Season {season:1}/{title} - S{season}E{episode}";

static RE_LEGACY_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+(?::\d+)?)\s*\}\}").unwrap());
static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)(?::(\d+))?\}").unwrap());
static RE_EMPTY_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|\[\s*\]").unwrap());
static RE_DOUBLE_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-(?:\s+-)+\s+").unwrap());
static RE_EDGE_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s+|\s+-\s*$").unwrap());
static RE_SPACE_COLLAPSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Renders names from per-type templates
///
/// Recognized placeholders: `{title}`, `{original_title}`, `{year}`,
/// `{season}`, `{episode}` and `{episode_title}`. Numbers are zero-padded
/// to two digits unless a width is given (`{season:1}`). A `/` in the
/// template starts a new directory level.
#[derive(Debug, Clone)]
pub struct NameRenderer {
    movie_template: String,
    tv_template: String,
}

impl Default for NameRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MOVIE_TEMPLATE, DEFAULT_TV_TEMPLATE)
    }
}

impl NameRenderer {
    pub fn new(movie_template: &str, tv_template: &str) -> Self {
        Self {
            movie_template: normalize_template(movie_template),
            tv_template: normalize_template(tv_template),
        }
    }

    /// Produce the relative target path ('/'-separated) for an input.
    /// Without a resolved identification the sanitized original name is kept.
    pub fn render(
        &self,
        input: &RawInput,
        guess: &ParsedGuess,
        resolved: Option<&ResolvedMedia>,
    ) -> String {
        let base = match resolved {
            Some(media) => self.render_resolved(guess, media),
            None => sanitize(&input.stem()),
        };

        match input.extension() {
            Some(ext) => format!("{}.{}", base, ext),
            None => base,
        }
    }

    fn render_resolved(&self, guess: &ParsedGuess, media: &ResolvedMedia) -> String {
        let is_tv = match media.media_type() {
            MediaType::Tv => true,
            MediaType::Movie => false,
            MediaType::Unknown => guess.media_type == MediaType::Tv || guess.season.is_some(),
        };
        let template = if is_tv {
            &self.tv_template
        } else {
            &self.movie_template
        };

        let components: Vec<String> = template
            .split('/')
            .map(|part| render_component(part, media))
            .filter(|part| !part.is_empty())
            .map(|part| sanitize(&part))
            .collect();

        if components.is_empty() {
            return sanitize(media.title());
        }

        components.join("/")
    }
}

/// Accept the legacy `{{title}}` syntax
fn normalize_template(template: &str) -> String {
    RE_LEGACY_PLACEHOLDER
        .replace_all(template.trim(), "{$1}")
        .into_owned()
}

fn render_component(part: &str, media: &ResolvedMedia) -> String {
    let filled = RE_PLACEHOLDER.replace_all(part, |caps: &Captures| {
        let width = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(2);

        match &caps[1] {
            "title" => media.title().to_string(),
            "original_title" => media
                .candidate
                .original_title
                .clone()
                .unwrap_or_else(|| media.title().to_string()),
            "year" => media.year().map(|y| y.to_string()).unwrap_or_default(),
            "season" => format!("{:0width$}", media.season.unwrap_or(1), width = width),
            "episode" => format!("{:0width$}", media.episode.unwrap_or(1), width = width),
            "episode_title" => media.episode_title.clone().unwrap_or_default(),
            _ => caps[0].to_string(),
        }
    });

    let cleaned = RE_EMPTY_GROUP.replace_all(&filled, "");
    let cleaned = RE_DOUBLE_DASH.replace_all(&cleaned, " - ");
    let cleaned = RE_EDGE_DASH.replace_all(&cleaned, "");
    RE_SPACE_COLLAPSE
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

/// Characters that are illegal in file/directory names on Windows or Unix
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a single path component (file or directory name)
pub fn sanitize(component: &str) -> String {
    let replaced: String = component
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = RE_SPACE_COLLAPSE.replace_all(&replaced, " ");
    let mut result = collapsed.trim().trim_end_matches(['.', ' ']).to_string();

    if result.is_empty() {
        return "Unknown".to_string();
    }

    let stem = result.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        result.insert(stem.len(), '_');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;

    fn is_safe_component(name: &str) -> bool {
        !name.is_empty() && !name.chars().any(|c| ILLEGAL_CHARS.contains(&c) || c.is_control())
    }

    fn resolved(title: &str, year: Option<i32>, media_type: MediaType) -> ResolvedMedia {
        ResolvedMedia {
            candidate: Candidate {
                provider: "tmdb".to_string(),
                provider_id: 1,
                title: title.to_string(),
                original_title: None,
                year,
                media_type,
                score: 1.0,
            },
            season: None,
            episode: None,
            episode_title: None,
        }
    }

    #[test]
    fn test_render_movie() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("/dl/Movie.Title.2023.1080p.BluRay.x264-GROUP.mkv");
        let media = resolved("Movie Title", Some(2023), MediaType::Movie);

        let name = renderer.render(&input, &ParsedGuess::default(), Some(&media));
        assert_eq!(name, "Movie Title (2023).mkv");
    }

    #[test]
    fn test_render_tv_default_layout() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("Show.Name.S01E02.mkv");
        let mut media = resolved("Show Name", Some(2021), MediaType::Tv);
        media.season = Some(1);
        media.episode = Some(2);

        let name = renderer.render(&input, &ParsedGuess::default(), Some(&media));
        assert_eq!(name, "Show Name (2021)/Season 1/Show Name - S01E02.mkv");
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("Show.Name.S01E02.mkv");
        let mut media = resolved("Show Name", Some(2021), MediaType::Tv);
        media.season = Some(1);
        media.episode = Some(2);

        let first = renderer.render(&input, &ParsedGuess::default(), Some(&media));
        for _ in 0..3 {
            assert_eq!(
                renderer.render(&input, &ParsedGuess::default(), Some(&media)),
                first
            );
        }
    }

    #[test]
    fn test_render_missing_year_collapses() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("Movie.mkv");
        let media = resolved("Movie", None, MediaType::Movie);

        assert_eq!(
            renderer.render(&input, &ParsedGuess::default(), Some(&media)),
            "Movie.mkv"
        );
    }

    #[test]
    fn test_render_episode_title_and_legacy_syntax() {
        let renderer = NameRenderer::new(
            "{{title}} ({{year}})",
            "{{title}}/S{{season}}E{{episode}} - {episode_title}",
        );
        let input = RawInput::file("x.mp4");
        let mut media = resolved("Show", Some(2020), MediaType::Tv);
        media.season = Some(2);
        media.episode = Some(10);

        assert_eq!(
            renderer.render(&input, &ParsedGuess::default(), Some(&media)),
            "Show/S02E10.mp4"
        );

        media.episode_title = Some("The End?".to_string());
        assert_eq!(
            renderer.render(&input, &ParsedGuess::default(), Some(&media)),
            "Show/S02E10 - The End.mp4"
        );
    }

    #[test]
    fn test_render_sanitizes_titles() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("face.off.1997.mkv");
        let media = resolved("Face/Off: Redux", Some(1997), MediaType::Movie);

        let name = renderer.render(&input, &ParsedGuess::default(), Some(&media));
        assert_eq!(name, "Face Off Redux (1997).mkv");
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_render_unresolved_falls_back() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("/dl/weird:name?.mkv");
        assert_eq!(
            renderer.render(&input, &ParsedGuess::default(), None),
            "weird name.mkv"
        );

        let input = RawInput::dir("/dl/Some.Pack.2020");
        assert_eq!(
            renderer.render(&input, &ParsedGuess::default(), None),
            "Some.Pack.2020"
        );
    }

    #[test]
    fn test_render_output_is_safe() {
        let renderer = NameRenderer::default();
        let input = RawInput::file("a.mkv");
        for title in ["A<B>C", "What?", "x|y*z", "\"Quoted\"", "back\\slash", "...", "tab\there"] {
            let mut media = resolved(title, Some(2020), MediaType::Tv);
            media.season = Some(1);
            media.episode = Some(1);
            let name = renderer.render(&input, &ParsedGuess::default(), Some(&media));
            assert!(name.split('/').all(is_safe_component), "unsafe: {name}");
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Title: Subtitle"), "Title Subtitle");
        assert_eq!(sanitize("Movie?<>Name"), "Movie Name");
        assert_eq!(sanitize("Filename..."), "Filename");
        assert_eq!(sanitize(":::"), "Unknown");
        assert_eq!(sanitize("测试: 动画"), "测试 动画");
        assert_eq!(sanitize("CON"), "CON_");
        assert_eq!(sanitize("nul.mkv"), "nul_.mkv");
    }
}
