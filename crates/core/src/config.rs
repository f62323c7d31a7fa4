use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;
/// Longest accepted refresh period, one year.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub youtube_api_key: String,
    pub youtube_api_base_url: String,
    pub chanwatch_env: String,
    pub port: u16,
    pub refresh_interval_secs: u64,
    pub refresh_on_start: bool,
    /// When false the api process serves requests without its own refresh
    /// timer, leaving refreshes to `chanwatch-worker`.
    pub scheduler_enabled: bool,
    pub http_timeout_secs: u64,
    pub db_max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let youtube_api_key = var("YOUTUBE_API_KEY").ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?;
        let database_url = var("DATABASE_URL")
            .or_else(|| var("CHANWATCH_DATABASE_URL"))
            .ok_or(ConfigError::Missing("DATABASE_URL or CHANWATCH_DATABASE_URL"))?;
        let youtube_api_base_url = var("YOUTUBE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE_URL.to_string());
        let chanwatch_env = var("CHANWATCH_ENV").unwrap_or_else(|| "development".to_string());

        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;
        let refresh_interval_secs = parse_or(
            var("CHANWATCH_REFRESH_INTERVAL_SECS"),
            "CHANWATCH_REFRESH_INTERVAL_SECS",
            DEFAULT_REFRESH_INTERVAL_SECS,
        )?;
        if !(1..=MAX_REFRESH_INTERVAL_SECS).contains(&refresh_interval_secs) {
            return Err(ConfigError::Invalid {
                name: "CHANWATCH_REFRESH_INTERVAL_SECS",
                value: refresh_interval_secs.to_string(),
            });
        }
        let refresh_on_start = parse_or(
            var("CHANWATCH_REFRESH_ON_START"),
            "CHANWATCH_REFRESH_ON_START",
            false,
        )?;
        let scheduler_enabled = parse_or(
            var("CHANWATCH_SCHEDULER_ENABLED"),
            "CHANWATCH_SCHEDULER_ENABLED",
            true,
        )?;
        let http_timeout_secs = parse_or(
            var("CHANWATCH_HTTP_TIMEOUT_SECS"),
            "CHANWATCH_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let db_max_connections = parse_or(
            var("CHANWATCH_DB_MAX_CONNECTIONS"),
            "CHANWATCH_DB_MAX_CONNECTIONS",
            DEFAULT_DB_MAX_CONNECTIONS,
        )?;

        Ok(Self {
            database_url,
            youtube_api_key,
            youtube_api_base_url,
            chanwatch_env,
            port,
            refresh_interval_secs,
            refresh_on_start,
            scheduler_enabled,
            http_timeout_secs,
            db_max_connections,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
