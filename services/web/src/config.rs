//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `config.env` file is used for local development.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Deployment mode. Selects the access-log destination, the static asset
/// cache policy and how much of an unexpected fault reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(format!("'{}' is neither development nor production", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub environment: Environment,
    pub log_filter: String,
    pub public_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `config.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from config.env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::from_filename("config.env").ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Database connection string ---
        let database_template = required("DATABASE")?;
        let username = required("USERNAME")?;
        let password = required("DATABASE_PASSWORD")?;
        let database_url = database_template
            .replace("<USERNAME>", &username)
            .replace("<PASSWORD>", &password);

        // --- Listener ---
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            None => 5000,
        };
        let bind_address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let environment = match lookup("NODE_ENV") {
            Some(raw) => raw
                .parse::<Environment>()
                .map_err(|e| ConfigError::InvalidValue("NODE_ENV".to_string(), e))?,
            None => Environment::Development,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let public_dir = lookup("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./public"));
        let log_dir = lookup("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./logs"));

        Ok(Self {
            bind_address,
            database_url,
            environment,
            log_filter,
            public_dir,
            log_dir,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
