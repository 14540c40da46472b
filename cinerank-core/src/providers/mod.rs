//! Movie catalog lookups.

pub mod tmdb;

use async_trait::async_trait;
use cinerank_model::MovieMetadata;

pub use tmdb::TmdbMetadataProvider;

/// Failures talking to the metadata catalog.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Lookup timed out")]
    Timeout,
}

/// Source of movie details keyed by the catalog's numeric id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieMetadataProvider: Send + Sync {
    async fn get_movie(&self, external_ref: i64) -> Result<MovieMetadata, ProviderError>;
}
