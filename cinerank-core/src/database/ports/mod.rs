//! Repository ports (interfaces) used by the ranking service.
//! Adapters live under `database::infrastructure`.

pub mod rankings;
