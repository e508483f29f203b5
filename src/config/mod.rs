// Configuration module entry point
// Loads layered configuration and holds shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    ApiConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StoreConfig,
};

impl Config {
    /// Load configuration from "config.toml" in the working directory
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("ACCOUNTD"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "accountd/0.1")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("api.url_param", "url")?
            .set_default("api.admin_role", "Administrator")?
            .set_default("store.path", "directory.toml")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist").expect("defaults should load");
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.api.url_param, "url");
        assert_eq!(cfg.api.admin_role, "Administrator");
        assert_eq!(cfg.http.max_body_size, 1_048_576);
        assert!(cfg.logging.log_dir.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load_from("does-not-exist").expect("defaults should load");
        let addr = cfg.get_socket_addr().expect("valid address");
        assert_eq!(addr.port(), 8080);
    }
}
