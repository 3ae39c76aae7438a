pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::PipelineConfig;
pub use core::*;
pub use errors::{ErrorKind, PipelineError, PipelineResult};
pub use state::AppState;
