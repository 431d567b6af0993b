//! HTTP service that builds, modifies and analyzes STEP models from scripts.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::{ServiceError, Stage};
pub use pipeline::Pipeline;
pub use routes::router;
pub use state::AppState;
