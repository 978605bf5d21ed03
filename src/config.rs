use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

use crate::payments::providers::smeplug::DEFAULT_PROXY_PATH;

/// Configuration of the proxy binary
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Route the proxy function is served on
    pub path: String,
    /// Bearer credential app clients must present
    pub client_token: Option<String>,
    /// Timeout for provider calls
    pub provider_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
        };

        let proxy = ProxyConfig {
            path: env::var("PROXY_PATH").unwrap_or_else(|_| DEFAULT_PROXY_PATH.to_string()),
            client_token: env::var("PROXY_CLIENT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("PROVIDER_TIMEOUT_SECS must be a valid number")?,
        };

        let config = Config {
            server,
            database,
            proxy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        if !self.proxy.path.starts_with('/') {
            return Err(anyhow!(
                "PROXY_PATH must start with '/', got {}",
                self.proxy.path
            ));
        }

        if self.proxy.provider_timeout_secs == 0 {
            return Err(anyhow!("PROVIDER_TIMEOUT_SECS must be greater than 0"));
        }

        // Production proxies must authenticate app clients
        if self.server.environment == "production" && self.proxy.client_token.is_none() {
            return Err(anyhow!("PROXY_CLIENT_TOKEN is required in production"));
        }

        Ok(())
    }
}
