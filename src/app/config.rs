use std::net::SocketAddr;

use anyhow::{Context, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid server address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Loads the configuration from the process environment.
///
/// Call `bootstrap::init_env` first so values from `.env` are visible.
pub fn load() -> Result<Config> {
    from_lookup(|key| std::env::var(key).ok())
}

pub fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

    let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {raw:?}"))?,
        None => DEFAULT_MAX_CONNECTIONS,
    };

    let host = lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match lookup("SERVER_PORT") {
        Some(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("SERVER_PORT must be a port number, got {raw:?}"))?,
        None => DEFAULT_PORT,
    };

    Ok(Config {
        server: ServerConfig { host, port },
        database: DatabaseConfig {
            url,
            max_connections,
        },
    })
}
