//! Short-video link resolution.
//!
//! Turns an opaque share link (e.g. `https://v.douyin.com/ABC123/`) into a
//! direct, playable media URL plus best-effort metadata. Resolution runs an
//! ordered chain of independent strategies; every attempt is recorded in a
//! [`ResolutionTrace`] that is returned to the caller whether or not the
//! chain succeeds.
//!
//! ```rust,ignore
//! use shortlink_resolver::{Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::default())?;
//! let result = resolver.resolve("https://v.douyin.com/ABC123/").await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod patterns;
pub mod resolver;
pub mod strategies;
pub mod trace;

#[cfg(test)]
mod test_support;

pub use config::{Endpoints, ResolverConfig};
pub use error::{AttemptError, FetchError, ResolveError};
pub use fetcher::{Fetch, FetchRequest, FetchResult, HttpFetcher};
pub use identity::{HeaderProfile, SpoofedIdentity};
pub use strategies::{Strategy, StrategyContext, StrategyHit, StrategyReport};
pub use patterns::{MediaCandidates, VideoId, normalize_input};
pub use resolver::{ResolutionResult, Resolved, Resolver, Unresolved};
pub use trace::{ResolutionAttempt, ResolutionTrace};
