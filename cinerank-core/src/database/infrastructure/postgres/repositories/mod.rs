//! PostgreSQL-backed repository implementations.

pub mod rankings;
