use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::sync::Arc;

use crate::models::{RenameRequest, TransferResult};
use crate::services::transfer::TransferError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/rename", post(rename))
}

/// POST /api/v1/storage/rename - rename or transfer a file or directory.
/// Per-file failures are reported in the body; only bad requests are errors.
async fn rename(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<TransferResult>, (StatusCode, String)> {
    if request.path.as_os_str().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "path is required".to_string()));
    }

    let result = state.organizer.rename(&request).await.map_err(|e| {
        let status = match e {
            TransferError::InvalidTransferMode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
    })?;

    tracing::info!(
        "Rename of {} finished: {} ({} succeeded, {} skipped, {} failed)",
        request.path.display(),
        result.status,
        result.succeeded_count(),
        result.skipped_count(),
        result.failed_count()
    );

    Ok(Json(result))
}
