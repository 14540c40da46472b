//! Adapters implementing the repository ports.

pub mod memory;

#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub mod postgres;
