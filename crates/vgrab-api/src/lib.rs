//! Axum HTTP server for the vgrab download form.
//!
//! This crate provides:
//! - The form page and the JSON API behind it
//! - Cookie-keyed in-memory sessions
//! - Preview and download orchestration over a [`vgrab_media::MediaExtractor`]
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod session;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use services::SessionSweeper;
pub use session::{SessionStore, SessionView, SESSION_COOKIE};
pub use state::AppState;
