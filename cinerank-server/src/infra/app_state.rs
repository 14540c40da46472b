use std::{fmt, sync::Arc};

use cinerank_core::ranking::RankingService;

use crate::infra::config::Config;

/// Where ratings are persisted, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub ranking: Arc<RankingService>,
    pub config: Arc<Config>,
    pub storage: StorageBackend,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        ranking: Arc<RankingService>,
        config: Arc<Config>,
        storage: StorageBackend,
    ) -> Self {
        Self {
            ranking,
            config,
            storage,
        }
    }

    pub fn ranking(&self) -> &RankingService {
        &self.ranking
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
