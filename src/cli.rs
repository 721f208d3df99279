//! Command-line interface parsing for the trivia proxy
//!
//! This module handles parsing of CLI arguments using clap. Every flag can
//! also be set from the environment (a `.env` file is loaded first by `main`).

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::data::opentdb::OPENTDB_BASE_URL;
use crate::query::QueryConfig;
use crate::retry::RetryConfig;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The upstream URL could not be parsed or is not http(s)
    #[error("Invalid upstream URL: '{0}'")]
    InvalidUpstreamUrl(String),

    /// The host/port pair does not form a socket address
    #[error("Invalid listen address: '{0}'")]
    InvalidListenAddress(String),

    /// A value that must be positive was zero
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
}

/// Environment variables consulted as flag fallbacks
pub const ENV_VARS: &[&str] = &[
    "TRIVIA_HOST",
    "PORT",
    "TRIVIA_UPSTREAM_URL",
    "TRIVIA_BATCH_SIZE",
    "TRIVIA_CACHE_TTL_SECS",
    "TRIVIA_COOLDOWN_MS",
    "TRIVIA_MAX_ATTEMPTS",
    "TRIVIA_RETRY_DELAY_MS",
    "TRIVIA_SWEEP_INTERVAL_SECS",
];

/// Trivia proxy - caching, rate-limit-aware front for Open Trivia DB
#[derive(Parser, Debug)]
#[command(name = "triviaproxy")]
#[command(about = "Caching, rate-limit-aware proxy for the Open Trivia DB API")]
#[command(version)]
pub struct Cli {
    /// IP address to bind the HTTP server to
    #[arg(long, env = "TRIVIA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Upstream question endpoint
    #[arg(long, env = "TRIVIA_UPSTREAM_URL", default_value = OPENTDB_BASE_URL)]
    pub upstream_url: String,

    /// Questions fetched upstream per cache fill
    #[arg(long, env = "TRIVIA_BATCH_SIZE", default_value_t = 50)]
    pub batch_size: u32,

    /// Lifetime of a cached batch, in seconds
    #[arg(long, env = "TRIVIA_CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Minimum spacing between upstream calls, in milliseconds
    #[arg(long, env = "TRIVIA_COOLDOWN_MS", default_value_t = 5000)]
    pub cooldown_ms: u64,

    /// Upstream attempts per cache fill
    #[arg(long, env = "TRIVIA_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Wait between failed attempts, in milliseconds (a 429 always waits the cooldown)
    #[arg(long, env = "TRIVIA_RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Seconds between expired-entry sweeps; 0 disables the sweep
    #[arg(long, env = "TRIVIA_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,
}

/// Validated configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Where the HTTP server listens
    pub listen_addr: SocketAddr,
    /// Upstream endpoint
    pub upstream_url: Url,
    /// Batch size and TTL for the orchestrator
    pub query: QueryConfig,
    /// Retry loop settings
    pub retry: RetryConfig,
    /// Rate limiter cooldown
    pub cooldown: Duration,
    /// Expiry sweep interval, `None` when disabled
    pub sweep_interval: Option<Duration>,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a value is out of range or unparseable
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let listen_addr = format!("{}:{}", cli.host, cli.port);
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| CliError::InvalidListenAddress(listen_addr.clone()))?;

        let upstream_url = parse_upstream_url(&cli.upstream_url)?;

        if cli.batch_size == 0 {
            return Err(CliError::MustBePositive("batch size"));
        }
        if cli.max_attempts == 0 {
            return Err(CliError::MustBePositive("max attempts"));
        }
        if cli.cache_ttl_secs == 0 {
            return Err(CliError::MustBePositive("cache TTL"));
        }

        let cooldown = Duration::from_millis(cli.cooldown_ms);

        Ok(StartupConfig {
            listen_addr,
            upstream_url,
            query: QueryConfig {
                batch_size: cli.batch_size,
                cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            },
            retry: RetryConfig::default()
                .with_max_attempts(cli.max_attempts)
                .with_base_delay(Duration::from_millis(cli.retry_delay_ms))
                .with_rate_limit_delay(cooldown),
            cooldown,
            sweep_interval: match cli.sweep_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }
}

/// Parses an upstream URL, accepting only http and https
pub fn parse_upstream_url(s: &str) -> Result<Url, CliError> {
    let url = Url::parse(s).map_err(|_| CliError::InvalidUpstreamUrl(s.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(CliError::InvalidUpstreamUrl(s.to_string())),
    }
}
