use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use bigdecimal::BigDecimal;
use cinerank_core::config::RankingConfig;
use cinerank_core::providers::tmdb::TMDB_API_BASE;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings; without a URL ratings live in memory only
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Catalog settings; without a token snapshots are stored as submitted
    pub tmdb_access_token: Option<String>,
    pub tmdb_base_url: String,

    // CORS settings; empty means any origin
    pub cors_allowed_origins: Vec<String>,

    pub ranking: RankingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            database_url: None,
            database_max_connections: 10,
            tmdb_access_token: None,
            tmdb_base_url: TMDB_API_BASE.to_string(),
            cors_allowed_origins: Vec::new(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Config {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset or blank keys keep their
    /// defaults; values that fail to parse are errors.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        let mut ranking = defaults.ranking.clone();

        if let Some(threshold) = parse_var(&get, "RANKING_THRESHOLD")? {
            ranking.initial_ranking_threshold = threshold;
        }
        if let Some(scale) = parse_var(&get, "RANKING_POSITION_SCALE")? {
            ranking.position_scale = scale;
        }
        if let Some(epsilon) = parse_var::<BigDecimal>(&get, "RANKING_FALLBACK_EPSILON")? {
            ranking.fallback_epsilon = epsilon;
        }
        if let Some(secs) = parse_var(&get, "PLACEMENT_SESSION_TTL_SECS")? {
            ranking.placement_session_ttl = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_var(&get, "METADATA_TIMEOUT_MS")? {
            ranking.metadata_timeout = Duration::from_millis(millis);
        }
        ranking
            .validate()
            .map_err(|err| anyhow!("invalid ranking configuration: {err}"))?;

        let database_max_connections = parse_var(&get, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or(defaults.database_max_connections);
        if database_max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be at least 1"));
        }

        Ok(Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var(&get, "SERVER_PORT")?.unwrap_or(defaults.server_port),
            database_url: get("DATABASE_URL"),
            database_max_connections,
            tmdb_access_token: get("TMDB_ACCESS_TOKEN"),
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            ranking,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| anyhow!("{err}"))
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.database_url.is_none());
        assert!(config.tmdb_access_token.is_none());
        assert_eq!(config.tmdb_base_url, TMDB_API_BASE);
        assert_eq!(config.ranking.initial_ranking_threshold, 10);
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = load(&[
            ("SERVER_PORT", " 8080 "),
            ("DATABASE_URL", "postgres://localhost/cinerank"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("RANKING_THRESHOLD", "5"),
            ("RANKING_POSITION_SCALE", "20"),
            ("RANKING_FALLBACK_EPSILON", "0.00000000000000000001"),
            ("PLACEMENT_SESSION_TTL_SECS", "60"),
            ("METADATA_TIMEOUT_MS", "750"),
        ])
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/cinerank")
        );
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.ranking.initial_ranking_threshold, 5);
        assert_eq!(config.ranking.position_scale, 20);
        assert_eq!(
            config.ranking.placement_session_ttl,
            Duration::from_secs(60)
        );
        assert_eq!(
            config.ranking.metadata_timeout,
            Duration::from_millis(750)
        );
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("DATABASE_URL", "  "), ("SERVER_HOST", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.server_host, "0.0.0.0");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("SERVER_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn inconsistent_ranking_settings_are_rejected() {
        assert!(load(&[("RANKING_THRESHOLD", "0")]).is_err());
        assert!(load(&[("RANKING_POSITION_SCALE", "40")]).is_err());
        assert!(load(&[
            ("RANKING_POSITION_SCALE", "10"),
            ("RANKING_FALLBACK_EPSILON", "0.0000000000001"),
        ])
        .is_err());
    }
}
