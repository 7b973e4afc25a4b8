use axum::Router;
use std::sync::Arc;

use crate::AppState;

mod storage;
mod transfer;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/transfer", transfer::routes()) // Recommended names (read-only)
        .nest("/storage", storage::routes()) // Rename / transfer execution
}
