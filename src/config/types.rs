// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub api: ApiConfig,
    pub store: StoreConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Directory for dated log files (stdout/stderr if not set)
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// API dispatch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Query parameter carrying the logical endpoint path
    pub url_param: String,
    /// Role name required by admin-only endpoints
    pub admin_role: String,
}

/// Directory store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the TOML directory file
    pub path: String,
}
