use std::sync::Arc;

use anyhow::Context;
use cinerank_core::{
    MIGRATOR,
    database::{
        RankingRepository,
        infrastructure::{
            memory::InMemoryRankingRepository, postgres::PostgresRankingRepository,
        },
    },
    providers::{MovieMetadataProvider, TmdbMetadataProvider},
    ranking::RankingService,
};
use cinerank_server::{
    AppState, create_app,
    infra::{app_state::StorageBackend, config::Config},
    spawn_session_sweeper,
};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "cinerank-server")]
#[command(about = "Movie rating service with relative stack ranking")]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("Loaded environment from .env");
    }

    if let Err(err) = run(cli).await {
        error!("Server failed: {err:#}");
        return Err(err);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    if let Some(host) = cli.host {
        config.server_host = host;
    }

    let (repository, storage): (Arc<dyn RankingRepository>, StorageBackend) =
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                MIGRATOR
                    .run(&pool)
                    .await
                    .context("failed to apply database migrations")?;
                info!("Connected to PostgreSQL, migrations applied");
                (
                    Arc::new(PostgresRankingRepository::new(pool)) as Arc<dyn RankingRepository>,
                    StorageBackend::Postgres,
                )
            }
            None => {
                warn!("DATABASE_URL not set; ratings are kept in memory and lost on restart");
                (
                    Arc::new(InMemoryRankingRepository::new()) as Arc<dyn RankingRepository>,
                    StorageBackend::Memory,
                )
            }
        };

    let metadata: Option<Arc<dyn MovieMetadataProvider>> =
        match &config.tmdb_access_token {
            Some(token) => Some(Arc::new(TmdbMetadataProvider::with_base_url(
                token.clone(),
                config.tmdb_base_url.clone(),
            )) as Arc<dyn MovieMetadataProvider>),
            None => {
                info!("TMDB_ACCESS_TOKEN not set; rating snapshots are stored as submitted");
                None
            }
        };

    let ranking = Arc::new(RankingService::new(
        repository,
        metadata,
        config.ranking.clone(),
    ));
    let addr = config.bind_address();
    let state = AppState::new(ranking, Arc::new(config), storage);

    let sweeper = spawn_session_sweeper(&state);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}
