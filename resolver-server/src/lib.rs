//! HTTP service hosting the share-link resolver.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
