use thiserror::Error;

use crate::providers::ProviderError;

/// Errors produced by ranking operations and their storage adapters.
#[derive(Error, Debug)]
pub enum RankingError {
    /// Malformed input: bad category, missing placement, invalid permutation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The user reached the ranking threshold without completing the
    /// initial bulk ranking.
    #[error(
        "Stack ranking required before adding more ratings ({total} rated so far)"
    )]
    RankingRequired { total: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Metadata provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RankingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RankingError>;
