// Transfer executor - applies naming decisions to the filesystem

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::models::{
    FileOutcome, NamingDecision, NonMediaPolicy, TransferMode, TransferPlan, TransferResult,
};
use crate::scanner;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("cannot hardlink across filesystems: {} -> {}", .from.display(), .to.display())]
    CrossDevice { from: PathBuf, to: PathBuf },

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("invalid transfer mode '{0}' (expected hardlink, copy, move or symlink)")]
    InvalidTransferMode(String),

    #[error("{} is a directory; {} requires a recursive transfer", .0.display(), .1)]
    DirectoryRequiresRecursive(PathBuf, TransferMode),

    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Stable identifier reported in per-file results
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::SourceNotFound(_) => "source_not_found",
            TransferError::DestinationExists(_) => "destination_exists",
            TransferError::CrossDevice { .. } => "cross_device",
            TransferError::PermissionDenied(_) => "permission_denied",
            TransferError::InvalidTransferMode(_) => "invalid_transfer_mode",
            TransferError::DirectoryRequiresRecursive(..) => "directory_requires_recursive",
            TransferError::Io { .. } => "io",
        }
    }

    fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TransferError::SourceNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => TransferError::PermissionDenied(path.to_path_buf()),
            _ => TransferError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// EXDEV on unix, ERROR_NOT_SAME_DEVICE on Windows
const CROSS_DEVICE_OS_ERROR: i32 = if cfg!(windows) { 17 } else { 18 };

pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(CROSS_DEVICE_OS_ERROR)
}

/// Supplies per-file naming decisions during recursive transfers
#[async_trait]
pub trait FileNamer: Send + Sync {
    async fn name_file(&self, path: &Path) -> NamingDecision;
}

#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub media_extensions: Vec<String>,
    pub non_media: NonMediaPolicy,
    /// Transfer media files that could not be identified under their
    /// sanitized original name instead of skipping them
    pub transfer_unresolved: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            media_extensions: scanner::default_media_extensions(),
            non_media: NonMediaPolicy::Skip,
            transfer_unresolved: false,
        }
    }
}

pub struct TransferExecutor {
    options: TransferOptions,
}

impl TransferExecutor {
    pub fn new(options: TransferOptions) -> Self {
        Self { options }
    }

    /// Execute a plan. Directory sources fan out per file when `recursive`
    /// is set; one file's failure never stops its siblings.
    pub async fn transfer(&self, plan: &TransferPlan, namer: &dyn FileNamer) -> TransferResult {
        let metadata = match fs::metadata(&plan.source).await {
            Ok(m) => m,
            Err(e) => {
                let err = TransferError::from_io(e, &plan.source);
                tracing::warn!("Cannot transfer {}: {}", plan.source.display(), err);
                return TransferResult::single(FileOutcome::failed(
                    &plan.source,
                    Some(plan.destination.as_path()),
                    &err,
                ));
            }
        };

        if !metadata.is_dir() {
            return TransferResult::single(
                self.transfer_one(&plan.source, &plan.destination, plan.mode, plan.overwrite)
                    .await,
            );
        }

        if plan.recursive {
            return self.transfer_tree(plan, namer).await;
        }

        match plan.mode {
            TransferMode::Move | TransferMode::Symlink => TransferResult::single(
                self.transfer_one(&plan.source, &plan.destination, plan.mode, plan.overwrite)
                    .await,
            ),
            TransferMode::Hardlink | TransferMode::Copy => {
                let err = TransferError::DirectoryRequiresRecursive(plan.source.clone(), plan.mode);
                TransferResult::single(FileOutcome::failed(
                    &plan.source,
                    Some(plan.destination.as_path()),
                    &err,
                ))
            }
        }
    }

    async fn transfer_tree(&self, plan: &TransferPlan, namer: &dyn FileNamer) -> TransferResult {
        let files = match scanner::walk_files(&plan.source).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Failed to walk {}: {:#}", plan.source.display(), e);
                let err = TransferError::Io {
                    path: plan.source.clone(),
                    source: io::Error::other(format!("{:#}", e)),
                };
                return TransferResult::single(FileOutcome::failed(&plan.source, None, &err));
            }
        };

        tracing::info!(
            "Transferring {} files from {} to {} ({})",
            files.len(),
            plan.source.display(),
            plan.destination.display(),
            plan.mode
        );

        let mut outcomes = Vec::with_capacity(files.len());

        for file in &files {
            let outcome = if scanner::is_media_file(file, &self.options.media_extensions) {
                let decision = namer.name_file(file).await;
                if !decision.is_resolved() && !self.options.transfer_unresolved {
                    tracing::debug!("Skipping unidentified media file: {}", file.display());
                    FileOutcome::skipped(file, None, "no metadata match")
                } else {
                    let destination = plan.destination.join(decision.target_path());
                    self.transfer_one(file, &destination, plan.mode, plan.overwrite)
                        .await
                }
            } else {
                match self.options.non_media {
                    NonMediaPolicy::Skip => FileOutcome::skipped(file, None, "not a media file"),
                    NonMediaPolicy::Copy => {
                        let relative = file.strip_prefix(&plan.source).unwrap_or(file.as_path());
                        let destination = plan.destination.join(relative);
                        self.transfer_one(file, &destination, TransferMode::Copy, plan.overwrite)
                            .await
                    }
                }
            };
            outcomes.push(outcome);
        }

        let result = TransferResult::from_outcomes(outcomes);
        tracing::info!(
            "Transfer of {} finished {}: {} succeeded, {} skipped, {} failed",
            plan.source.display(),
            result.status,
            result.succeeded_count(),
            result.skipped_count(),
            result.failed_count()
        );
        result
    }

    /// Single-entry transfer with the mode's full contract
    pub async fn transfer_one(
        &self,
        source: &Path,
        destination: &Path,
        mode: TransferMode,
        overwrite: bool,
    ) -> FileOutcome {
        match self.apply(source, destination, mode, overwrite).await {
            Ok(true) => {
                tracing::info!(
                    "{} {} -> {}",
                    mode,
                    source.display(),
                    destination.display()
                );
                FileOutcome::succeeded(source, destination)
            }
            Ok(false) => {
                tracing::debug!("{} is already in place", destination.display());
                FileOutcome::skipped(source, Some(destination), "source and destination are the same file")
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to {} {} -> {}: {}",
                    mode,
                    source.display(),
                    destination.display(),
                    err
                );
                FileOutcome::failed(source, Some(destination), &err)
            }
        }
    }

    /// Returns `Ok(false)` when nothing needed doing. An existing destination
    /// is only replaced once the new entry is fully in place beside it.
    async fn apply(
        &self,
        source: &Path,
        destination: &Path,
        mode: TransferMode,
        overwrite: bool,
    ) -> Result<bool, TransferError> {
        let source_meta = fs::metadata(source)
            .await
            .map_err(|e| TransferError::from_io(e, source))?;
        let is_dir = source_meta.is_dir();

        let mut replace_existing = false;
        if let Ok(existing) = fs::symlink_metadata(destination).await {
            if same_file(source, destination).await {
                return Ok(false);
            }
            if !overwrite || existing.is_dir() {
                return Err(TransferError::DestinationExists(destination.to_path_buf()));
            }
            replace_existing = true;
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TransferError::from_io(e, parent))?;
            }
        }

        if !replace_existing {
            perform(source, destination, mode, is_dir).await?;
            return Ok(true);
        }

        let staging = staging_path(destination);
        let _ = fs::remove_file(&staging).await;

        if let Err(err) = perform(source, &staging, mode, is_dir).await {
            let _ = fs::remove_file(&staging).await;
            return Err(retarget(err, &staging, destination));
        }

        if let Err(e) = fs::rename(&staging, destination).await {
            if mode == TransferMode::Move {
                let _ = fs::rename(&staging, source).await;
            } else {
                let _ = fs::remove_file(&staging).await;
            }
            return Err(TransferError::from_io(e, destination));
        }

        Ok(true)
    }
}

async fn perform(
    source: &Path,
    destination: &Path,
    mode: TransferMode,
    is_dir: bool,
) -> Result<(), TransferError> {
    match mode {
        TransferMode::Hardlink => fs::hard_link(source, destination).await.map_err(|e| {
            if is_cross_device(&e) {
                TransferError::CrossDevice {
                    from: source.to_path_buf(),
                    to: destination.to_path_buf(),
                }
            } else {
                TransferError::from_io(e, destination)
            }
        }),
        TransferMode::Copy => copy_file(source, destination).await,
        TransferMode::Move => move_entry(source, destination, is_dir).await,
        TransferMode::Symlink => {
            let target = fs::canonicalize(source)
                .await
                .map_err(|e| TransferError::from_io(e, source))?;
            create_symlink(&target, destination, is_dir).await
        }
    }
}

/// Hidden sibling the replacement is built in: `.{name}.partial`
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.partial", name))
}

/// Report errors against the requested destination, not the staging path
fn retarget(err: TransferError, staging: &Path, destination: &Path) -> TransferError {
    let swap = |path: PathBuf| {
        if path == staging {
            destination.to_path_buf()
        } else {
            path
        }
    };
    match err {
        TransferError::CrossDevice { from, to } => TransferError::CrossDevice {
            from,
            to: swap(to),
        },
        TransferError::PermissionDenied(path) => TransferError::PermissionDenied(swap(path)),
        TransferError::SourceNotFound(path) => TransferError::SourceNotFound(swap(path)),
        TransferError::Io { path, source } => TransferError::Io {
            path: swap(path),
            source,
        },
        other => other,
    }
}

/// Same path after resolution, or (on unix) the same inode
async fn same_file(a: &Path, b: &Path) -> bool {
    if let (Ok(ca), Ok(cb)) = (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        if ca == cb {
            return true;
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(ma), Ok(mb)) = (fs::symlink_metadata(a).await, fs::symlink_metadata(b).await) {
            return ma.dev() == mb.dev() && ma.ino() == mb.ino();
        }
    }

    false
}

/// Copy that never leaves a partial destination behind
async fn copy_file(source: &Path, destination: &Path) -> Result<(), TransferError> {
    if let Err(e) = fs::copy(source, destination).await {
        let _ = fs::remove_file(destination).await;
        return Err(TransferError::from_io(e, source));
    }
    Ok(())
}

async fn move_entry(source: &Path, destination: &Path, is_dir: bool) -> Result<(), TransferError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                "Rename crosses devices, copying {} instead",
                source.display()
            );
            if is_dir {
                if let Err(err) = copy_dir_all(source, destination).await {
                    let _ = fs::remove_dir_all(destination).await;
                    return Err(err);
                }
                fs::remove_dir_all(source)
                    .await
                    .map_err(|e| TransferError::from_io(e, source))
            } else {
                copy_file(source, destination).await?;
                fs::remove_file(source)
                    .await
                    .map_err(|e| TransferError::from_io(e, source))
            }
        }
        Err(e) => Err(TransferError::from_io(e, source)),
    }
}

async fn copy_dir_all(source: &Path, destination: &Path) -> Result<(), TransferError> {
    fs::create_dir_all(destination)
        .await
        .map_err(|e| TransferError::from_io(e, destination))?;

    let mut entries = fs::read_dir(source)
        .await
        .map_err(|e| TransferError::from_io(e, source))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TransferError::from_io(e, source))?
    {
        let from = entry.path();
        let to = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| TransferError::from_io(e, &from))?;

        if file_type.is_dir() {
            Box::pin(copy_dir_all(&from, &to)).await?;
        } else {
            fs::copy(&from, &to)
                .await
                .map_err(|e| TransferError::from_io(e, &from))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn create_symlink(target: &Path, link: &Path, _is_dir: bool) -> Result<(), TransferError> {
    fs::symlink(target, link)
        .await
        .map_err(|e| TransferError::from_io(e, link))
}

#[cfg(windows)]
async fn create_symlink(target: &Path, link: &Path, is_dir: bool) -> Result<(), TransferError> {
    let result = if is_dir {
        fs::symlink_dir(target, link).await
    } else {
        fs::symlink_file(target, link).await
    };
    result.map_err(|e| TransferError::from_io(e, link))
}
