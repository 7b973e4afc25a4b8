// Identification-and-transfer pipeline: parse -> resolve -> render -> transfer

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::models::{
    FileKind, NamingDecision, RawInput, RecommendedName, RenameRequest, TransferMode,
    TransferPlan, TransferResult,
};
use crate::scanner;
use crate::services::metadata::MetadataResolver;
use crate::services::namer::{sanitize, NameRenderer};
use crate::services::transfer::{FileNamer, TransferError, TransferExecutor, TransferOptions};

pub struct MediaOrganizer {
    resolver: MetadataResolver,
    renderer: NameRenderer,
    executor: TransferExecutor,
    default_mode: TransferMode,
    default_overwrite: bool,
}

impl MediaOrganizer {
    pub fn new(
        resolver: MetadataResolver,
        renderer: NameRenderer,
        executor: TransferExecutor,
        default_mode: TransferMode,
        default_overwrite: bool,
    ) -> Self {
        Self {
            resolver,
            renderer,
            executor,
            default_mode,
            default_overwrite,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let resolver = MetadataResolver::from_config(&config.metadata)?;
        let renderer = NameRenderer::new(&config.naming.movie_template, &config.naming.tv_template);
        let executor = TransferExecutor::new(TransferOptions {
            media_extensions: config.transfer.media_extensions.clone(),
            non_media: config.transfer.non_media,
            transfer_unresolved: config.transfer.transfer_unresolved,
        });

        Ok(Self::new(
            resolver,
            renderer,
            executor,
            config.transfer.default_mode,
            config.transfer.overwrite,
        ))
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Parse, resolve and render one input without touching the filesystem
    pub async fn decide(&self, input: RawInput) -> NamingDecision {
        let guess = scanner::parse_input(&input);
        let resolved = self.resolver.resolve(&guess).await;
        let target = self.renderer.render(&input, &guess, resolved.as_ref());

        tracing::debug!(
            "Naming decision for {}: {} (resolved: {})",
            input.path.display(),
            target,
            resolved.is_some()
        );

        NamingDecision {
            input,
            guess,
            resolved,
            target,
        }
    }

    /// Recommended name for the query endpoint. Files get the final rendered
    /// component, directories the top-level folder.
    pub async fn recommend(&self, path: &Path, kind: FileKind) -> RecommendedName {
        if !path.exists() {
            return RecommendedName {
                success: false,
                name: None,
                path: None,
                message: Some("path does not exist".to_string()),
                decision: None,
            };
        }

        let decision = self.decide(RawInput::new(path, kind)).await;
        let name = match kind {
            FileKind::File => decision.file_name().to_string(),
            FileKind::Dir => decision.top_level().to_string(),
        };
        let message = (!decision.is_resolved())
            .then(|| "no metadata match, keeping the original name".to_string());

        RecommendedName {
            success: true,
            name: Some(name),
            path: Some(decision.target.clone()),
            message,
            decision: Some(decision),
        }
    }

    /// Execute a rename/transfer request. Only an invalid mode is an error;
    /// filesystem problems are reported inside the result.
    pub async fn rename(&self, request: &RenameRequest) -> Result<TransferResult, TransferError> {
        let mode = match request.mode.as_deref() {
            Some(m) => m.parse::<TransferMode>()?,
            None => self.default_mode,
        };
        let plan = self.plan(request, mode).await;

        tracing::info!(
            "Rename request: {} -> {} ({}, recursive: {})",
            plan.source.display(),
            plan.destination.display(),
            plan.mode,
            plan.recursive
        );

        Ok(self.executor.transfer(&plan, self).await)
    }

    async fn plan(&self, request: &RenameRequest, mode: TransferMode) -> TransferPlan {
        let source = request.path.clone();
        let is_dir = tokio::fs::metadata(&source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        let base = request
            .target_dir
            .clone()
            .unwrap_or_else(|| parent_of(&source));
        let new_name = request
            .new_name
            .as_deref()
            .map(sanitize_relative)
            .filter(|name| !name.as_os_str().is_empty());

        let destination = if is_dir && request.recursive {
            match &new_name {
                Some(name) => base.join(name),
                None => base,
            }
        } else if let Some(name) = new_name {
            base.join(name)
        } else {
            let kind = if is_dir { FileKind::Dir } else { FileKind::File };
            let decision = self.decide(RawInput::new(&source, kind)).await;
            match (kind, request.target_dir.is_some()) {
                (FileKind::Dir, _) => base.join(decision.top_level()),
                (FileKind::File, true) => base.join(decision.target_path()),
                (FileKind::File, false) => base.join(decision.file_name()),
            }
        };

        TransferPlan {
            source,
            destination,
            mode,
            recursive: request.recursive,
            overwrite: request.overwrite.unwrap_or(self.default_overwrite),
        }
    }
}

#[async_trait]
impl FileNamer for MediaOrganizer {
    async fn name_file(&self, path: &Path) -> NamingDecision {
        self.decide(RawInput::file(path)).await
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Caller-supplied names may carry subdirectories; each level is sanitized
fn sanitize_relative(name: &str) -> PathBuf {
    name.split(['/', '\\'])
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(sanitize)
        .collect()
}
