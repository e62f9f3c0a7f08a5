//! HTTP API comparing a single small model against a proposer/critic debate.

pub mod config;
pub mod error;
pub mod routes;
pub mod samples;

pub use config::{ConfigError, EndpointConfig, ServerConfig, SingleMode};
pub use error::ApiError;
pub use routes::{build_router, AppState, CallerFactory, HttpCallerFactory, ProblemRequest};
pub use samples::{SampleProblem, SAMPLE_PROBLEMS};
