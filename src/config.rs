// ⚙️ Configuration - environment (and optional .env) driven settings

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level configuration for the console and API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub valuation: ValuationConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_path = var_or("PROPERTY_OPS_DB", "property_ops.db");
        let model_path = var_or("PROPERTY_OPS_MODEL", "artifacts/model.json");
        let columns_path = var_or("PROPERTY_OPS_COLUMNS", "artifacts/model_columns.csv");

        let host = var_or("PROPERTY_OPS_HOST", "127.0.0.1");
        let port = var_or("PROPERTY_OPS_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("PROPERTY_OPS_LOG_LEVEL", "info");

        Ok(Self {
            database_path: PathBuf::from(database_path),
            valuation: ValuationConfig {
                model_path: PathBuf::from(model_path),
                columns_path: PathBuf::from(columns_path),
            },
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Where the price model artifacts live.
#[derive(Debug, Clone)]
pub struct ValuationConfig {
    pub model_path: PathBuf,
    pub columns_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PROPERTY_OPS_PORT must be a valid u16")]
    InvalidPort,

    #[error("PROPERTY_OPS_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
}
