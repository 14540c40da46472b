//! Persistence for ranked items and per-user ranking state.

pub mod infrastructure;
pub mod ports;

pub use ports::rankings::{NewRankedItem, RankingRepository};
