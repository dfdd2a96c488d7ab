//! HTTP surface: the resolution endpoint plus the access gate around it.

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
