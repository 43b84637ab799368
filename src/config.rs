use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::Level;

use crate::logging::{LogDefaults, TracingSink};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used by `log_err` when the caller does not pick one
    pub default_level: Level,
    /// `tracing_subscriber` filter directive
    pub filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
            },
            logging: LoggingConfig {
                default_level: env::var("ERRS_LOG_LEVEL")
                    .unwrap_or_else(|_| "error".to_string())
                    .parse()
                    .context("ERRS_LOG_LEVEL must be one of trace, debug, info, warn, error")?,
                filter: env::var("RUST_LOG").unwrap_or_else(|_| "info,errs=debug".to_string()),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Defaults for [`crate::logging::install_defaults`]
    pub fn log_defaults(&self) -> LogDefaults {
        LogDefaults {
            sink: Arc::new(TracingSink),
            level: self.logging.default_level,
        }
    }
}
