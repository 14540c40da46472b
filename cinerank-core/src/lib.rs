//! # Cinerank Core
//!
//! Core library for the Cinerank ranking service: every user keeps a strictly
//! ordered personal ranking of the movies they rated, and this crate owns the
//! rules that keep that order consistent.
//!
//! ## Overview
//!
//! - **Position allocation**: arbitrary-precision fractional positions in (0, 1)
//!   assigned by midpoint bisection between two neighbors
//! - **Rebalancing**: atomic even re-spacing of a user's list when bisection
//!   runs out of representable room
//! - **Placement resolution**: category-seeded binary search over pairwise
//!   "better / worse / similar" comparisons
//! - **Initial bulk ranking**: one-time manual ordering of a user's first ratings
//! - **Persistence**: repository port with PostgreSQL and in-memory adapters
//! - **Catalog lookups**: TMDB movie metadata used to fill rating snapshots
//!
//! ## Feature Flags
//!
//! - `database`: Enables the PostgreSQL adapter and embedded migrations (SQLx)
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cinerank_core::{
//!     config::RankingConfig,
//!     database::infrastructure::memory::InMemoryRankingRepository,
//!     ranking::{RankingService, SubmitRating},
//! };
//! use cinerank_model::{MetadataSnapshot, RatingCategory};
//! use uuid::Uuid;
//!
//! async fn rate_first_movie() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = Arc::new(InMemoryRankingRepository::new());
//!     let service = RankingService::new(repository, None, RankingConfig::default());
//!
//!     let outcome = service
//!         .submit_rating(SubmitRating {
//!             owner_id: Uuid::now_v7(),
//!             external_ref: 550,
//!             category: RatingCategory::Great,
//!             snapshot: MetadataSnapshot::default(),
//!             placement: None,
//!         })
//!         .await?;
//!
//!     println!("placed at {}", outcome.item.position);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Ranking tunables (thresholds, category defaults, decimal precision)
pub mod config;

/// Repository ports and their PostgreSQL / in-memory adapters
pub mod database;

/// Error types and error handling utilities
pub mod error;

/// External metadata providers (TMDB integration)
pub mod providers;

/// Position allocation, rebalancing, placement search and the ranking service
pub mod ranking;

/// Embedded schema migrations for the ranking tables
#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{RankingError, Result};
