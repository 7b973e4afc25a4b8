use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod models;
mod scanner;
mod services;

use config::AppConfig;
use models::{AggregateStatus, FileKind, FileStatus, RenameRequest, TransferResult};
use services::organizer::MediaOrganizer;

/// Identify downloaded movies and episodes and organize them into a
/// Plex-friendly library layout
#[derive(Debug, Parser)]
#[command(name = "plex-rename", version, about)]
struct Cli {
    /// Path to a config.toml (defaults to the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Trace-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,

    /// Print the recommended name for a file or directory
    Name {
        path: PathBuf,

        /// Treat the path as a directory
        #[arg(long)]
        dir: bool,

        /// Print the full decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename or transfer a file or directory
    Rename {
        path: PathBuf,

        /// Target name (the recommended name is used when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Library root to place the result under
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// hardlink, copy, move or symlink
        #[arg(long)]
        mode: Option<String>,

        /// Process every file under a directory
        #[arg(short, long)]
        recursive: bool,

        /// Replace existing destinations
        #[arg(long)]
        overwrite: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

pub struct AppState {
    pub organizer: MediaOrganizer,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "plex_rename=trace,tower_http=debug"
    } else {
        "plex_rename=debug,tower_http=debug"
    };

    // Initialize tracing (stderr, so CLI output stays clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load(cli.config.as_deref());
    config.log_config();

    let organizer =
        MediaOrganizer::from_config(&config).context("Failed to set up metadata providers")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(&config, organizer).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Name { path, dir, json } => {
            let kind = if dir || tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
                FileKind::Dir
            } else {
                FileKind::File
            };
            let recommended = organizer.recommend(&path, kind).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&recommended)?);
            } else if let Some(target) = &recommended.path {
                println!("{}", target);
            }
            if let Some(message) = &recommended.message {
                eprintln!("{}", message);
            }

            Ok(exit_code(recommended.success))
        }
        Command::Rename {
            path,
            name,
            target_dir,
            mode,
            recursive,
            overwrite,
            json,
        } => {
            let request = RenameRequest {
                path,
                new_name: name,
                target_dir,
                mode,
                recursive,
                overwrite: overwrite.then_some(true),
            };

            let result = match organizer.rename(&request).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }

            Ok(exit_code(result.status != AggregateStatus::Failed))
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_result(result: &TransferResult) {
    for file in &result.files {
        let destination = file
            .destination
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        match &file.status {
            FileStatus::Succeeded => {
                println!("ok      {} -> {}", file.source.display(), destination)
            }
            FileStatus::Skipped { reason } => {
                println!("skipped {} ({})", file.source.display(), reason)
            }
            FileStatus::Failed { reason, .. } => {
                println!("failed  {}: {}", file.source.display(), reason)
            }
        }
    }
    println!(
        "{}: {} succeeded, {} skipped, {} failed",
        result.status,
        result.succeeded_count(),
        result.skipped_count(),
        result.failed_count()
    );
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve(config: &AppConfig, organizer: MediaOrganizer) -> Result<()> {
    let providers = organizer.resolver().provider_names();
    if organizer.resolver().has_providers() {
        tracing::info!("Active metadata providers: {}", providers.join(", "));
    }

    let state = Arc::new(AppState { organizer });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
