//! Lit Listener Server Library
//!
//! HTTP and CLI surface over the `lit-pipeline` effect engine: path
//! resolution, per-file run serialization and error mapping.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use services::{FileLocks, PathResolver, ProcessingService};
pub use state::AppState;
