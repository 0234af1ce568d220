/// Server services
pub mod locks;
pub mod processing;
pub mod resolver;

pub use locks::FileLocks;
pub use processing::{ProcessOutcome, ProcessingService, SharedLauncher, WorkingCopyStatus};
pub use resolver::PathResolver;
