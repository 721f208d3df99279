//! Trivia proxy - caching, rate-limit-aware front for Open Trivia DB
//!
//! Serves `GET /api/questions` to the browser UI, fetching from upstream at
//! most once per cooldown window and caching each result batch for an hour.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use triviaproxy::cache::{CacheManager, QuestionCache};
use triviaproxy::cli::{Cli, StartupConfig};
use triviaproxy::data::OpenTdbClient;
use triviaproxy::query::QueryService;
use triviaproxy::rate_limit::RateLimiter;
use triviaproxy::retry::RetryPolicy;
use triviaproxy::server::router;
use triviaproxy::sweep::SweepHandle;

/// Loads `.env` from the working directory, then from its parent
///
/// Variables already set in the environment win over both files.
fn load_env() {
    let _ = dotenv::dotenv();
    let _ = dotenv::from_path("../.env");
}

/// Initializes logging, honouring `RUST_LOG` when set
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolves when the process receives Ctrl+C
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let source = Arc::new(OpenTdbClient::new(config.upstream_url.as_str())?);
    let cache: Arc<dyn QuestionCache> = Arc::new(CacheManager::new());

    let service = QueryService::new(source, Arc::clone(&cache))
        .with_limiter(Arc::new(RateLimiter::new(config.cooldown)))
        .with_retry(RetryPolicy::new(config.retry.clone()))
        .with_config(config.query.clone());

    // Background sweep of expired batches
    let sweeper = config
        .sweep_interval
        .map(|interval| SweepHandle::spawn(Arc::clone(&cache), interval));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(
        upstream = %config.upstream_url,
        batch_size = config.query.batch_size,
        "Server listening at http://{}",
        config.listen_addr
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    Ok(())
}
