use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/marketplace";
const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60 * 24 * 365;
const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_ARGON2_ITERATIONS: u32 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,

    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    /// Shared key venue staff present to obtain a concert-bound staff token.
    pub staff_access_key: String,

    /// Lets purchases and withdrawals drive a wallet below zero.
    pub allow_overdraft: bool,

    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Config {
    pub fn new(jwt_secret: impl Into<String>, staff_access_key: impl Into<String>) -> Self {
        Self {
            store_backend: StoreBackend::Postgres,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 5,
            server_host: "0.0.0.0".to_string(),
            server_port: 3001,
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            staff_access_key: staff_access_key.into(),
            allow_overdraft: false,
            argon2_memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            argon2_iterations: DEFAULT_ARGON2_ITERATIONS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;
        let staff_access_key = required("STAFF_ACCESS_KEY")?;
        let defaults = Self::new(jwt_secret, staff_access_key);

        Ok(Self {
            store_backend: parsed("STORE_BACKEND", defaults.store_backend)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parsed(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed("SERVER_PORT", defaults.server_port)?,
            token_ttl_secs: parsed("TOKEN_TTL_SECS", defaults.token_ttl_secs)?,
            allow_overdraft: parsed("ALLOW_OVERDRAFT", defaults.allow_overdraft)?,
            argon2_memory_kib: parsed("ARGON2_MEMORY_KIB", defaults.argon2_memory_kib)?,
            argon2_iterations: parsed("ARGON2_ITERATIONS", defaults.argon2_iterations)?,
            ..defaults
        })
    }

    pub fn server_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.server_host, self.server_port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            var: "SERVER_HOST",
            value: raw,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn parsed<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
