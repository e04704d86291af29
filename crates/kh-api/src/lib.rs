//! # kh-api
//!
//! Server-rendered web interface for Knowledge Hub.
//!
//! Every page except login, registration and the health check requires a
//! logged-in employee. Form posts are protected by a per-session CSRF token.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod web;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig, SessionConfig};
pub use state::AppState;
