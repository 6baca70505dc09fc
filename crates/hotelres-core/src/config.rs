//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Every tunable the cache and the engine read is carried here and passed to
//! constructors at startup; nothing reads the environment after boot.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8087
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Apply embedded migrations at startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_run_migrations() -> bool {
    true
}

/// Distributed cache configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache server addresses (`host:port`), or `memory` for an in-process cache
    #[serde(default = "default_cache_servers")]
    pub servers: Vec<String>,

    /// Per-operation timeout in milliseconds
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
}

fn default_cache_servers() -> Vec<String> {
    vec!["127.0.0.1:6379".to_string()]
}

fn default_op_timeout() -> u64 {
    2000
}

impl CacheConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// True when configured for the in-process cache
    pub fn is_memory(&self) -> bool {
        self.servers.len() == 1 && self.servers[0].eq_ignore_ascii_case("memory")
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            servers: default_cache_servers(),
            op_timeout_ms: default_op_timeout(),
        }
    }
}

/// Retry, reconnect and reset-limiter tunables
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Retries after the first try of a single cache operation
    #[serde(default = "default_op_attempts")]
    pub op_attempts: u32,

    /// Sleep between retries (after the first, which reconnects immediately)
    #[serde(default = "default_op_delay")]
    pub op_delay_ms: u64,

    /// Attempts for the initial cache connect
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// First backoff of the initial connect, doubled per attempt
    #[serde(default = "default_connect_initial_delay")]
    pub connect_initial_delay_ms: u64,

    /// Backoff cap of the initial connect
    #[serde(default = "default_connect_max_delay")]
    pub connect_max_delay_ms: u64,

    /// Concurrent connection resets allowed process-wide
    #[serde(default = "default_reset_concurrency")]
    pub reset_concurrency: usize,

    /// How long a reset waits for a limiter slot before being skipped
    #[serde(default = "default_reset_acquire_timeout")]
    pub reset_acquire_timeout_ms: u64,
}

fn default_op_attempts() -> u32 {
    3
}

fn default_op_delay() -> u64 {
    50
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_initial_delay() -> u64 {
    1000
}

fn default_connect_max_delay() -> u64 {
    30_000
}

fn default_reset_concurrency() -> usize {
    5
}

fn default_reset_acquire_timeout() -> u64 {
    100
}

impl RetryConfig {
    pub fn op_delay(&self) -> Duration {
        Duration::from_millis(self.op_delay_ms)
    }

    pub fn reset_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_acquire_timeout_ms)
    }

    /// Backoff before connect attempt `attempt` (1-based), doubling and capped
    pub fn connect_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay = self.connect_initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.connect_max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            op_attempts: default_op_attempts(),
            op_delay_ms: default_op_delay(),
            connect_attempts: default_connect_attempts(),
            connect_initial_delay_ms: default_connect_initial_delay(),
            connect_max_delay_ms: default_connect_max_delay(),
            reset_concurrency: default_reset_concurrency(),
            reset_acquire_timeout_ms: default_reset_acquire_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8087)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 20)?
            .set_default("cache.op_timeout_ms", 2000)?
            .set_default("retry.op_attempts", 3)?
            .set_default("retry.op_delay_ms", 50)?
            .set_default("retry.connect_attempts", 5)?
            .set_default("retry.connect_initial_delay_ms", 1000)?
            .set_default("retry.connect_max_delay_ms", 30_000)?
            .set_default("retry.reset_concurrency", 5)?
            .set_default("retry.reset_acquire_timeout_ms", 100)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with HOTELRES_ prefix
            .add_source(
                Environment::with_prefix("HOTELRES")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.servers")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("HOTELRES")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.servers")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.op_attempts, 3);
        assert_eq!(config.op_delay(), Duration::from_millis(50));
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.reset_concurrency, 5);
        assert_eq!(config.reset_acquire_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_connect_backoff_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.connect_backoff(1), Duration::from_secs(1));
        assert_eq!(config.connect_backoff(2), Duration::from_secs(2));
        assert_eq!(config.connect_backoff(4), Duration::from_secs(8));
        assert_eq!(config.connect_backoff(6), Duration::from_secs(30));
        assert_eq!(config.connect_backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_memory_cache_detection() {
        let mut config = CacheConfig::default();
        assert!(!config.is_memory());

        config.servers = vec!["MEMORY".to_string()];
        assert!(config.is_memory());

        config.servers = vec!["memory".to_string(), "10.0.0.1:6379".to_string()];
        assert!(!config.is_memory());
    }
}
