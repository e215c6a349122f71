//! TheTVDB v4 API: transport, authentication and the cached client.

pub mod api_types;
pub mod auth;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{Credentials, TokenManager, MAX_TOKEN_AGE};
pub use cached_client::{CachedTvdbClient, MAX_PAGES};
pub use client::{ApiRequest, HttpTransport, TvdbTransport};
pub use error::{Result, TvdbError};
