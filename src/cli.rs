//! Command-line interface parsing for the Pont Chaban-Delmas server
//!
//! This module handles CLI arguments using clap and resolves them against
//! the PORT and BASE_URL environment variables into the final server
//! configuration, matching how the service is deployed.

use std::time::Duration;

use clap::Parser;

use crate::cache::{CacheConfig, RetryPolicy};

/// Port used when neither `--port` nor `$PORT` is set
const DEFAULT_PORT: u16 = 3000;

/// Pont Chaban-Delmas closure forecasts over HTTP
#[derive(Parser, Debug)]
#[command(name = "pontchaban")]
#[command(about = "Web page and iCal feed for the Pont Chaban-Delmas closures")]
#[command(version)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on; falls back to $PORT, then 3000
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Public base URL used in subscription links; falls back to $BASE_URL,
    /// then http://localhost:<port>
    #[arg(long)]
    pub base_url: Option<String>,

    /// Hours a fetched schedule stays fresh
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_ttl_hours: u64,

    /// Hours between autonomous background refreshes
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval_hours: u64,
}

/// Configuration derived from CLI arguments and the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Public base URL for subscription links
    pub base_url: String,
    /// Cache timings handed to the schedule cache
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments, consulting the
    /// PORT and BASE_URL environment variables for unset flags.
    pub fn from_cli(cli: &Cli) -> Self {
        Self::resolve(
            cli,
            std::env::var("PORT").ok(),
            std::env::var("BASE_URL").ok(),
        )
    }

    /// Resolution with explicit environment values, flag first, then the
    /// environment, then compiled defaults.
    fn resolve(cli: &Cli, env_port: Option<String>, env_base_url: Option<String>) -> Self {
        let port = cli
            .port
            .or_else(|| env_port.and_then(|raw| raw.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        let base_url = cli
            .base_url
            .clone()
            .or(env_base_url)
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let cache = CacheConfig {
            ttl: Duration::from_secs(cli.cache_ttl_hours * 60 * 60),
            refresh_interval: Duration::from_secs(cli.refresh_interval_hours * 60 * 60),
            retry: RetryPolicy::default(),
        };

        Self {
            host: cli.host.clone(),
            port,
            base_url,
            cache,
        }
    }
}
