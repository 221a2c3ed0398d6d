pub mod access_log;
pub mod api;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod rate_limit;
pub mod render;
pub mod sanitize;
pub mod state;
pub mod static_files;
pub mod views;
pub mod webhook;

// Re-export what the binary and the integration tests need to build the app.
pub use error::AppError;
pub use pipeline::build_app;
pub use state::AppState;
