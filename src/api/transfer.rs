use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::{FileKind, RecommendedName};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/name", get(get_recommended_name))
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub path: String,
    /// "file" or "dir"; detected from the filesystem when omitted
    pub filetype: Option<FileKind>,
}

/// GET /api/v1/transfer/name - recommended name for a file or directory
async fn get_recommended_name(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<RecommendedName>, (StatusCode, String)> {
    let path = query.path.trim();
    if path.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "path is required".to_string()));
    }
    let path = PathBuf::from(path);

    let kind = match query.filetype {
        Some(kind) => kind,
        None => match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => FileKind::Dir,
            _ => FileKind::File,
        },
    };

    tracing::debug!("Name query for {} ({:?})", path.display(), kind);

    Ok(Json(state.organizer.recommend(&path, kind).await))
}
