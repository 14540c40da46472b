//! Core data model definitions shared across Cinerank crates.
#![allow(missing_docs)]

#[cfg(feature = "serde")]
pub mod api;
pub mod category;
pub mod error;
pub mod ids;
pub mod ranking;
pub mod routes;

// Intentionally curated re-exports for downstream consumers.
#[cfg(feature = "serde")]
pub use api::ApiResponse;
pub use category::{ComparisonDecision, RatingCategory};
pub use error::{ModelError, Result as ModelResult};
pub use ids::RankedItemId;
pub use ranking::{
    MetadataSnapshot, MovieMetadata, Placement, RankedItem, UserRankingState,
};
