use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::services::transfer::TransferError;

/// Whether a captured path names a single file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Dir,
}

/// Path handed to the pipeline by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawInput {
    pub path: PathBuf,
    pub kind: FileKind,
}

impl RawInput {
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileKind::File)
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileKind::Dir)
    }

    /// Last path component, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Extension of a file input (directories never carry one)
    pub fn extension(&self) -> Option<String> {
        if self.kind == FileKind::Dir {
            return None;
        }
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| is_extension_like(e))
            .map(|e| e.to_string())
    }

    /// File name without the extension returned by [`RawInput::extension`]
    pub fn stem(&self) -> String {
        let name = self.file_name();
        match self.extension() {
            Some(ext) => name
                .strip_suffix(&format!(".{}", ext))
                .map(|s| s.to_string())
                .unwrap_or(name),
            None => name,
        }
    }
}

/// An extension is short, alphanumeric and carries at least one letter,
/// so "Movie.2023" keeps its year.
pub fn is_extension_like(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= 5
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    #[default]
    Unknown,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
            MediaType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Structured guess extracted from a noisy file name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedGuess {
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    /// Release noise stripped from the name (resolution, codec, group...)
    pub noise: Vec<String>,
    /// Explicit `{tmdbid=...}` tag found in the name
    pub tmdb_id: Option<i64>,
    /// Explicit `{doubanid=...}` tag found in the name
    pub douban_id: Option<i64>,
}

/// One provider's proposed identification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub provider: String,
    pub provider_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub media_type: MediaType,
    pub score: f64,
}

/// The candidate accepted as the identification, plus episode context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMedia {
    pub candidate: Candidate,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub episode_title: Option<String>,
}

impl ResolvedMedia {
    pub fn new(candidate: Candidate, guess: &ParsedGuess) -> Self {
        Self {
            candidate,
            season: guess.season,
            episode: guess.episode,
            episode_title: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.candidate.title
    }

    pub fn year(&self) -> Option<i32> {
        self.candidate.year
    }

    pub fn media_type(&self) -> MediaType {
        self.candidate.media_type
    }
}

/// Recommended name for one input; returned by the query endpoint and
/// consumed by the transfer step.
#[derive(Debug, Clone, Serialize)]
pub struct NamingDecision {
    pub input: RawInput,
    pub guess: ParsedGuess,
    pub resolved: Option<ResolvedMedia>,
    /// Relative target path, '/'-separated
    pub target: String,
}

impl NamingDecision {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Final component of the rendered path
    pub fn file_name(&self) -> &str {
        self.target.rsplit('/').next().unwrap_or(&self.target)
    }

    /// First component of the rendered path (show or movie folder)
    pub fn top_level(&self) -> &str {
        self.target.split('/').next().unwrap_or(&self.target)
    }

    /// Rendered path as a relative `PathBuf`
    pub fn target_path(&self) -> PathBuf {
        self.target.split('/').collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Hardlink,
    Copy,
    Move,
    Symlink,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Hardlink => write!(f, "hardlink"),
            TransferMode::Copy => write!(f, "copy"),
            TransferMode::Move => write!(f, "move"),
            TransferMode::Symlink => write!(f, "symlink"),
        }
    }
}

impl FromStr for TransferMode {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hardlink" | "link" => Ok(TransferMode::Hardlink),
            "copy" => Ok(TransferMode::Copy),
            "move" | "rename" => Ok(TransferMode::Move),
            "symlink" | "softlink" => Ok(TransferMode::Symlink),
            _ => Err(TransferError::InvalidTransferMode(s.to_string())),
        }
    }
}

/// What to do with non-media files met during a recursive transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonMediaPolicy {
    #[default]
    Skip,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub source: PathBuf,
    /// Target file path, or destination root for recursive transfers
    pub destination: PathBuf,
    pub mode: TransferMode,
    pub recursive: bool,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Skipped { reason: String },
    Failed { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn succeeded(source: &Path, destination: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: Some(destination.to_path_buf()),
            status: FileStatus::Succeeded,
        }
    }

    pub fn skipped(source: &Path, destination: Option<&Path>, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            status: FileStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(source: &Path, destination: Option<&Path>, error: &TransferError) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            status: FileStatus::Failed {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, FileStatus::Succeeded)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FileStatus::Skipped { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Succeeded,
    Partial,
    Failed,
}

impl AggregateStatus {
    /// `failed` only when something failed and nothing succeeded
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let succeeded = outcomes.iter().filter(|o| o.is_succeeded()).count();

        match (failed, succeeded) {
            (0, _) => AggregateStatus::Succeeded,
            (_, 0) => AggregateStatus::Failed,
            _ => AggregateStatus::Partial,
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateStatus::Succeeded => write!(f, "succeeded"),
            AggregateStatus::Partial => write!(f, "partial"),
            AggregateStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    pub status: AggregateStatus,
    pub files: Vec<FileOutcome>,
}

impl TransferResult {
    pub fn from_outcomes(files: Vec<FileOutcome>) -> Self {
        Self {
            status: AggregateStatus::from_outcomes(&files),
            files,
        }
    }

    pub fn single(outcome: FileOutcome) -> Self {
        Self::from_outcomes(vec![outcome])
    }

    pub fn succeeded_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_succeeded()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    pub path: PathBuf,
    /// Desired target name; the recommended one is used when absent
    pub new_name: Option<String>,
    /// Library root to place results under; defaults to the source's parent
    pub target_dir: Option<PathBuf>,
    pub mode: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedName {
    pub success: bool,
    pub name: Option<String>,
    pub path: Option<String>,
    pub message: Option<String>,
    pub decision: Option<NamingDecision>,
}
