//! HTTP API for the CineCritique backend.
//!
//! Thin Axum layer over the service crates: feature extraction, provider
//! routing, the analysis cache, and the cost ledger. Handlers own no
//! business logic beyond wiring those services into request flows.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
