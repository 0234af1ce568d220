/// Shared application state
use crate::services::ProcessingService;
use lit_pipeline::CancellationToken;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub processing: Arc<ProcessingService>,
    /// Cancelled on shutdown; every run gets a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(processing: Arc<ProcessingService>, shutdown: CancellationToken) -> Self {
        Self {
            processing,
            shutdown,
        }
    }
}
