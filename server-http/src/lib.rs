pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod validation;

// Re-export key types
pub use error::ApiError;
pub use routes::{build_app, build_router};
pub use state::AppState;
