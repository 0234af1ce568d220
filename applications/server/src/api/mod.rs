/// API route modules
pub mod health;
pub mod process;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

/// Routes under `/api`, plus the audio directory at `/files`
pub fn router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/audio/process", post(process::process_audio))
        .route("/audio/working", get(process::working_copy));

    let files = ServeDir::new(app_state.processing.resolver().audio_dir());

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/files", files)
        .with_state(app_state)
}
