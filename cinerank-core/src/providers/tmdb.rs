use async_trait::async_trait;
use cinerank_model::MovieMetadata;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{MovieMetadataProvider, ProviderError};

/// Public TMDB v3 endpoint.
pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// Subset of TMDB's `/movie/{id}` payload the ranking flow caches.
#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
}

impl From<TmdbMovie> for MovieMetadata {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            overview: movie.overview.unwrap_or_default(),
            poster_path: movie.poster_path,
            // TMDB sends "" for unknown release dates
            release_date: movie.release_date.filter(|date| !date.is_empty()),
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
        }
    }
}

/// TMDB `/movie/{id}` client authenticated with a v4 read access token.
#[derive(Debug, Clone)]
pub struct TmdbMetadataProvider {
    client: Client,
    base_url: String,
    access_token: String,
}

impl TmdbMetadataProvider {
    /// Client against the public TMDB API.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, TMDB_API_BASE)
    }

    /// Client against another base URL, such as a local stub server.
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Details endpoint for one movie, relative to the configured base URL.
    pub fn movie_url(&self, external_ref: i64) -> Result<Url, ProviderError> {
        let raw = format!(
            "{}/movie/{external_ref}",
            self.base_url.trim_end_matches('/')
        );
        Url::parse(&raw).map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    fn parse_movie(body: &str) -> Result<MovieMetadata, ProviderError> {
        serde_json::from_str::<TmdbMovie>(body)
            .map(MovieMetadata::from)
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl MovieMetadataProvider for TmdbMetadataProvider {
    async fn get_movie(&self, external_ref: i64) -> Result<MovieMetadata, ProviderError> {
        let url = self.movie_url(external_ref)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await?;
                Self::parse_movie(&body)
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound),
            StatusCode::UNAUTHORIZED => Err(ProviderError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            status => Err(ProviderError::ApiError(format!(
                "TMDB API error: {status}"
            ))),
        }
    }
}
