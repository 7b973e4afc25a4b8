use anyhow::{Context, Result};
use chrono::Datelike;
use regex::{Captures, Regex};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

use crate::models::{FileKind, MediaType, ParsedGuess, RawInput};

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "m2ts", "mts",
    "vob", "ogm", "ogv", "divx", "xvid", "rmvb", "rm", "asf", "3gp", "3g2", "f4v", "iso",
];

static RE_ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\{\[]\s*(tmdbid|tmdb|doubanid|douban)\s*[=\-:]\s*(\d+)\s*[\}\]]").unwrap()
});
static RE_GROUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\[【](.*?)[\]】]\s*[\-]?\s*").unwrap());
static RE_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]|【([^】]*)】").unwrap());
static RE_RELEASE_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)2160p|1440p|1080p|1080i|720p|576p|480p|\d{3,4}x\d{3,4}|blu-?ray|bdrip|brrip|bdremux|web-?dl|webrip|hdtv|hdrip|dvdrip|dvd9|dvd5|x\.?26[45]|h\.?26[45]|hevc|xvid|divx|aac(?:2\.0|5\.1)?|e?ac3|ddp?(?:5\.1|2\.0)|dts(?:-hd)?|truehd|flac|10-?bit|8bit|hdr10\+?"
    ).unwrap()
});
/// Words that are also ordinary title words; noise only next to other release info
static RE_RELEASE_WEAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)remux|atmos|hdr|sdr|uhd|4k|avc|repack|proper|dubbed|subbed|amzn|dsnp|hmax|nf")
        .unwrap()
});
static RE_SEASON_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ss](\d{1,2})\s?[Ee](\d{1,4})").unwrap());
static RE_CROSS_EP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s._\-\(])(\d{1,2})[xX](\d{1,3})(?:$|[\s._\-\)])").unwrap()
});
static RE_CN_EP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第\s*(\d{1,3})\s*季\s*第\s*(\d{1,4})\s*[集话話]").unwrap()
});
static RE_ANIME_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s-\s*(\d{1,4})(?:v\d)?\s*$").unwrap());
static RE_SEASON_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\(])(?:S(\d{1,2})|Season[\s._]?(\d{1,2}))(?:$|[\s._\-\)])")
        .unwrap()
});
static RE_CN_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*(\d{1,3})\s*季").unwrap());
static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());
static RE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[._]+|-{2,}").unwrap());
static RE_SPACE_COLLAPSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Check a path against a media extension allow-list (case-insensitive)
pub fn is_media_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Default allow-list as owned strings
pub fn default_media_extensions() -> Vec<String> {
    VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

/// Parse a captured input, keeping the whole name of directories
pub fn parse_input(input: &RawInput) -> ParsedGuess {
    parse_name(&input.file_name(), input.kind)
}

/// Parse a file or directory name into a structured guess
/// Supports multiple formats:
/// - "Movie.Title.2023.1080p.BluRay.x264-GROUP.mkv" (movie)
/// - "Show.Name.S01E02.mkv" / "Show Name 1x02.mkv" (standard episode)
/// - "剧名 第1季第2集.mp4" (Chinese episode)
/// - "[Group] Show Name - 05 [1080p].mkv" (anime absolute numbering)
/// - "Show.Name.S01.1080p.WEB-DL" (season pack)
pub fn parse_name(name: &str, kind: FileKind) -> ParsedGuess {
    let stem = match kind {
        FileKind::File => RawInput::file(name).stem(),
        FileKind::Dir => name.to_string(),
    };

    let mut guess = ParsedGuess::default();
    let mut work = extract_id_tags(&stem, &mut guess);

    let mut has_group_tag = false;
    if let Some(caps) = RE_GROUP_TAG.captures(&work) {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        // A leading bracketed year is part of the name, not a group
        if !is_year_token(tag) {
            has_group_tag = true;
            guess.noise.push(tag.to_string());
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            work = work[end..].to_string();
        }
    }

    work = strip_brackets(&work, &mut guess.noise);
    let (work, noise_start) = strip_release_info(&work, &mut guess.noise);

    if let Some((raw_title, season, episode)) = detect_episode(&work, has_group_tag) {
        guess.media_type = MediaType::Tv;
        guess.season = season;
        guess.episode = episode;
        let (title, year) = split_year(raw_title, noise_start);
        guess.title = title;
        guess.year = year;
    } else {
        let (title, year) = split_year(&work, noise_start);
        guess.media_type = if year.is_some() {
            MediaType::Movie
        } else {
            MediaType::Unknown
        };
        guess.title = title;
        guess.year = year;
    }

    if guess.title.is_empty() {
        guess.title = fallback_title(&work, &stem);
    }

    guess
}

fn extract_id_tags(name: &str, guess: &mut ParsedGuess) -> String {
    RE_ID_TAG
        .replace_all(name, |caps: &Captures| {
            let provider = caps[1].to_lowercase();
            if let Ok(id) = caps[2].parse::<i64>() {
                if provider.starts_with("tmdb") {
                    guess.tmdb_id = Some(id);
                } else {
                    guess.douban_id = Some(id);
                }
            }
            " ".to_string()
        })
        .into_owned()
}

/// Drop bracketed groups ("[1080p]", "【字幕组】") but keep bracketed years
fn strip_brackets(name: &str, noise: &mut Vec<String>) -> String {
    RE_BRACKET
        .replace_all(name, |caps: &Captures| {
            let inner = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            if is_year_token(inner) {
                format!(" {} ", inner)
            } else {
                if !inner.is_empty() {
                    noise.push(inner.to_string());
                }
                " ".to_string()
            }
        })
        .into_owned()
}

/// Blank out release-info tokens (same byte length, so offsets stay valid).
/// Returns the cleaned name and where the first token started.
fn strip_release_info(name: &str, noise: &mut Vec<String>) -> (String, Option<usize>) {
    let spans = release_spans(name);
    let mut cleaned = name.to_string();

    for span in &spans {
        noise.push(name[span.clone()].to_string());
        cleaned.replace_range(span.clone(), &" ".repeat(span.len()));
    }

    (cleaned, spans.first().map(|s| s.start))
}

fn release_spans(name: &str) -> Vec<Range<usize>> {
    let bounded = |m: &regex::Match| {
        let before = name[..m.start()].chars().next_back();
        let after = name[m.end()..].chars().next();
        before.is_none_or(is_separator) && after.is_none_or(is_separator)
    };

    let strong: Vec<Range<usize>> = RE_RELEASE_INFO
        .find_iter(name)
        .filter(bounded)
        .map(|m| m.range())
        .collect();

    let is_noise_word = |word: &Range<usize>| {
        let text = &name[word.clone()];
        strong.iter().any(|s| s.start < word.end && word.start < s.end)
            || RE_RELEASE_WEAK
                .find(text)
                .is_some_and(|m| m.range() == (0..text.len()))
            || is_year_token(text)
            || RE_SEASON_EP.is_match(text)
    };

    let mut spans = strong.clone();
    for m in RE_RELEASE_WEAK.find_iter(name).filter(bounded) {
        // The leading word always belongs to the title ("Atmos 2020")
        if name[..m.start()].chars().all(is_separator) {
            continue;
        }
        let neighbors = [word_before(name, m.start()), word_after(name, m.end())];
        if neighbors.iter().flatten().any(&is_noise_word) {
            spans.push(m.range());
        }
    }

    spans.sort_by_key(|s| s.start);
    spans
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '.' | '_' | '-' | '(' | ')' | '[' | ']')
}

fn word_before(name: &str, pos: usize) -> Option<Range<usize>> {
    let head = name[..pos].trim_end_matches(is_separator);
    if head.is_empty() {
        return None;
    }
    let start = head.rfind(is_separator).map(|i| i + 1).unwrap_or(0);
    Some(start..head.len())
}

fn word_after(name: &str, pos: usize) -> Option<Range<usize>> {
    let tail = &name[pos..];
    let start = pos + (tail.len() - tail.trim_start_matches(is_separator).len());
    let rest = &name[start..];
    if rest.is_empty() {
        return None;
    }
    let len = rest.find(is_separator).unwrap_or(rest.len());
    Some(start..start + len)
}

/// Returns the raw title (text before the marker) with season/episode
fn detect_episode(name: &str, has_group_tag: bool) -> Option<(&str, Option<i32>, Option<i32>)> {
    if let Some(caps) = RE_SEASON_EP.captures(name) {
        let season: i32 = caps.get(1)?.as_str().parse().ok()?;
        let episode: i32 = caps.get(2)?.as_str().parse().ok()?;
        return Some((&name[..caps.get(0)?.start()], Some(season), Some(episode)));
    }

    if let Some(caps) = RE_CROSS_EP.captures(name) {
        let season: i32 = caps.get(1)?.as_str().parse().ok()?;
        let episode: i32 = caps.get(2)?.as_str().parse().ok()?;
        if season >= 1 && episode >= 1 {
            return Some((&name[..caps.get(0)?.start()], Some(season), Some(episode)));
        }
    }

    if let Some(caps) = RE_CN_EP.captures(name) {
        let season: i32 = caps.get(1)?.as_str().parse().ok()?;
        let episode: i32 = caps.get(2)?.as_str().parse().ok()?;
        return Some((&name[..caps.get(0)?.start()], Some(season), Some(episode)));
    }

    // Absolute numbering is only trusted on fansub-style names
    if has_group_tag {
        if let Some(caps) = RE_ANIME_EP.captures(name.trim_end()) {
            let episode: i32 = caps.get(1)?.as_str().parse().ok()?;
            if episode >= 1 && !is_plausible_year(episode) {
                return Some((&name[..caps.get(0)?.start()], Some(1), Some(episode)));
            }
        }
    }

    if let Some(caps) = RE_SEASON_ONLY.captures(name) {
        let season: i32 = caps
            .get(1)
            .or_else(|| caps.get(2))?
            .as_str()
            .parse()
            .ok()?;
        return Some((&name[..caps.get(0)?.start()], Some(season), None));
    }

    if let Some(caps) = RE_CN_SEASON.captures(name) {
        let season: i32 = caps.get(1)?.as_str().parse().ok()?;
        return Some((&name[..caps.get(0)?.start()], Some(season), None));
    }

    None
}

/// Split "Title 2023 ..." into ("Title", Some(2023)) using the last
/// plausible year that still leaves a title in front of it. Years ahead of
/// the release info win over years inside it; without a year the title
/// ends where the release info begins.
fn split_year(raw: &str, noise_start: Option<usize>) -> (String, Option<i32>) {
    let limit = noise_start.unwrap_or(raw.len()).min(raw.len());
    let mut before_noise = None;
    let mut anywhere = None;

    for m in RE_YEAR.find_iter(raw) {
        // Part of a longer number ("12023", "20231")
        let digit_before = raw[..m.start()].ends_with(|c: char| c.is_ascii_digit());
        let digit_after = raw[m.end()..].starts_with(|c: char| c.is_ascii_digit());
        if digit_before || digit_after {
            continue;
        }
        let Ok(year) = m.as_str().parse::<i32>() else {
            continue;
        };
        if !is_plausible_year(year) {
            continue;
        }
        let title = normalize_title(&raw[..m.start()]);
        if title.is_empty() {
            continue;
        }
        if m.start() < limit {
            before_noise = Some((title.clone(), year));
        }
        anywhere = Some((title, year));
    }

    match before_noise.or(anywhere) {
        Some((title, year)) => (title, Some(year)),
        None => {
            let title = normalize_title(&raw[..limit]);
            if title.is_empty() {
                (normalize_title(raw), None)
            } else {
                (title, None)
            }
        }
    }
}

fn fallback_title(cleaned: &str, stem: &str) -> String {
    let title = normalize_title(cleaned);
    if !title.is_empty() {
        return title;
    }
    let title = normalize_title(stem);
    if !title.is_empty() {
        return title;
    }
    stem.trim().to_string()
}

fn is_year_token(s: &str) -> bool {
    s.len() == 4
        && s.chars().all(|c| c.is_ascii_digit())
        && s.parse::<i32>().map(is_plausible_year).unwrap_or(false)
}

fn is_plausible_year(year: i32) -> bool {
    let max = chrono::Local::now().year() + 1;
    (1900..=max).contains(&year)
}

/// Separator normalization only; case is preserved
pub fn normalize_title(raw: &str) -> String {
    let name = RE_SEPARATORS.replace_all(raw, " ");
    let name = RE_SPACE_COLLAPSE.replace_all(&name, " ");

    name.trim_start_matches([' ', '-', ')', ']'])
        .trim_end_matches([' ', '-', '(', '[', '_', '.'])
        .to_string()
}

/// Collect every regular file below `root`, sorted by path
pub async fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(root, &mut files).await?;
    files.sort();
    Ok(files)
}

async fn walk_dir(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to read directory {}", path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        let file_type = entry.file_type().await?;

        if file_type.is_dir() {
            Box::pin(walk_dir(&entry_path, files)).await?;
        } else if file_type.is_file() {
            files.push(entry_path);
        } else {
            tracing::debug!("Skipping non-regular entry: {}", entry_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> ParsedGuess {
        parse_name(name, FileKind::File)
    }

    #[test]
    fn test_parse_scene_movie() {
        let parsed = parse("Movie.Title.2023.1080p.BluRay.x264-GROUP.mkv");

        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2023));
        assert_eq!(parsed.season, None);
        assert!(parsed.noise.iter().any(|t| t == "1080p"));
    }

    #[test]
    fn test_parse_standard_episode() {
        let parsed = parse("Show.Name.S01E02.mkv");

        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Show Name");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(2));
        assert_eq!(parsed.year, None);

        let parsed = parse("Breaking Bad S01E05.mkv");
        assert_eq!(parsed.title, "Breaking Bad");
        assert_eq!(parsed.episode, Some(5));
    }

    #[test]
    fn test_parse_episode_with_year() {
        let parsed = parse("Show.Name.2021.S02E10.1080p.WEB-DL.DDP5.1.H.264-NTb.mkv");

        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Show Name");
        assert_eq!(parsed.year, Some(2021));
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(10));
    }

    #[test]
    fn test_parse_cross_episode() {
        let parsed = parse("Show Name 1x02.avi");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Show Name");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(2));

        let parsed = parse("01x05 - Pilot.mkv");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(5));
    }

    #[test]
    fn test_resolution_is_not_an_episode() {
        let parsed = parse("Movie Title 2019 1920x1080.mp4");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2019));
    }

    #[test]
    fn test_parse_chinese_episode() {
        let parsed = parse("三体.第1季第12集.2160p.mp4");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "三体");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(12));
    }

    #[test]
    fn test_parse_anime_episode() {
        let parsed = parse("[SubsPlease] Frieren - 05 [1080p].mkv");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Frieren");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(5));
        assert!(parsed.noise.iter().any(|t| t == "SubsPlease"));
    }

    #[test]
    fn test_dash_number_without_group_is_not_episode() {
        let parsed = parse("Some Title - 05.mkv");
        assert_eq!(parsed.media_type, MediaType::Unknown);
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn test_parse_season_pack_dir() {
        let input = RawInput::dir("/downloads/Himouto.Umaru.chan.S01.1080p.BluRay.x265-smol");
        let parsed = parse_input(&input);

        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Himouto Umaru chan");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn test_parse_movie_with_parens() {
        let parsed = parse("The Matrix (1999).mkv");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));
    }

    #[test]
    fn test_parse_numeric_title() {
        let parsed = parse("1917.2019.2160p.UHD.BluRay.mkv");
        assert_eq!(parsed.title, "1917");
        assert_eq!(parsed.year, Some(2019));

        let parsed = parse("2001.A.Space.Odyssey.1968.mkv");
        assert_eq!(parsed.title, "2001 A Space Odyssey");
        assert_eq!(parsed.year, Some(1968));
    }

    #[test]
    fn test_out_of_range_year_is_ignored() {
        let parsed = parse("Blade.Runner.2049.mkv");
        assert_eq!(parsed.media_type, MediaType::Unknown);
        assert_eq!(parsed.title, "Blade Runner 2049");
    }

    #[test]
    fn test_parse_id_tags() {
        let parsed = parse("Movie Title (2023) {tmdbid=550}.mkv");
        assert_eq!(parsed.tmdb_id, Some(550));
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2023));

        let parsed = parse("Show Name {douban-26794435} S01E01.mkv");
        assert_eq!(parsed.douban_id, Some(26794435));
        assert_eq!(parsed.title, "Show Name");
    }

    #[test]
    fn test_unknown_keeps_whole_name() {
        let parsed = parse("home_video_final.mp4");
        assert_eq!(parsed.media_type, MediaType::Unknown);
        assert_eq!(parsed.title, "home video final");
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn test_parse_never_returns_empty_title() {
        let parsed = parse("1080p.mkv");
        assert!(!parsed.title.is_empty());

        let parsed = parse("S01E01.mkv");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert!(!parsed.title.is_empty());
    }

    #[test]
    fn test_episode_marker_after_release_info() {
        let parsed = parse("Show.Name.1080p.S01E02.mkv");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.title, "Show Name");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(2));

        let parsed = parse("Show.Name.WEB-DL.x264.第1季第3集.mp4");
        assert_eq!(parsed.media_type, MediaType::Tv);
        assert_eq!(parsed.episode, Some(3));
    }

    #[test]
    fn test_year_after_release_info() {
        let parsed = parse("Movie.Title.REMUX.2023.mkv");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2023));
        assert!(parsed.noise.iter().any(|t| t == "REMUX"));

        let parsed = parse("Movie.Title.1080p.2023.x264-GRP.mkv");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.year, Some(2023));
    }

    #[test]
    fn test_release_words_inside_titles() {
        let parsed = parse("The.NF.Story.2019.mkv");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "The NF Story");
        assert_eq!(parsed.year, Some(2019));

        let parsed = parse("Atmos.2020.mkv");
        assert_eq!(parsed.media_type, MediaType::Movie);
        assert_eq!(parsed.title, "Atmos");
        assert_eq!(parsed.year, Some(2020));

        let parsed = parse("Conference.Room.2018.1080p.AMZN.WEB-DL.mkv");
        assert_eq!(parsed.title, "Conference Room");
        assert!(parsed.noise.iter().any(|t| t == "AMZN"));
    }

    #[test]
    fn test_year_inside_release_group_is_ignored() {
        let parsed = parse("Movie.Title.2021.1080p.BluRay.x264-GRP2020.mkv");
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2021));
    }

    #[test]
    fn test_markers_survive_any_noise_position() {
        let noise = ["1080p", "WEB-DL", "x265", "HEVC", "10bit", "DDP5.1", "BluRay"];
        for token in noise {
            let parsed = parse(&format!("Show.Name.{}.S02E07.mkv", token));
            assert_eq!(parsed.media_type, MediaType::Tv, "{token}");
            assert_eq!((parsed.season, parsed.episode), (Some(2), Some(7)), "{token}");
            assert_eq!(parsed.title, "Show Name", "{token}");

            let parsed = parse(&format!("Movie.Name.{}.2015.mkv", token));
            assert_eq!(parsed.media_type, MediaType::Movie, "{token}");
            assert_eq!(parsed.year, Some(2015), "{token}");
            assert_eq!(parsed.title, "Movie Name", "{token}");
        }
    }

    #[test]
    fn test_unknown_title_stops_at_release_info() {
        let parsed = parse("Some.Clip.1080p.WEB-DL.x264-GRP.mkv");
        assert_eq!(parsed.media_type, MediaType::Unknown);
        assert_eq!(parsed.title, "Some Clip");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Re.ZERO.Starting.Life."), "Re ZERO Starting Life");
        assert_eq!(normalize_title("Spider-Man__Far--From Home"), "Spider-Man Far From Home");
        assert_eq!(normalize_title("  The Matrix ( "), "The Matrix");
    }

    #[test]
    fn test_is_media_file() {
        let exts = default_media_extensions();
        assert!(is_media_file(Path::new("/a/b/Movie.MKV"), &exts));
        assert!(is_media_file(Path::new("clip.mp4"), &exts));
        assert!(!is_media_file(Path::new("Movie.nfo"), &exts));
        assert!(!is_media_file(Path::new("README"), &exts));
    }

    #[tokio::test]
    async fn test_walk_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Season 1")).unwrap();
        std::fs::write(root.join("b.mkv"), b"b").unwrap();
        std::fs::write(root.join("a.nfo"), b"a").unwrap();
        std::fs::write(root.join("Season 1").join("c.mkv"), b"c").unwrap();

        let files = walk_files(root).await.unwrap();
        assert_eq!(
            files,
            vec![
                root.join("Season 1").join("c.mkv"),
                root.join("a.nfo"),
                root.join("b.mkv"),
            ]
        );
    }
}
