use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "VIP_BIND_ADDR";
pub const BOOKINGS_FILE_VAR: &str = "VIP_BOOKINGS_FILE";
pub const CLIENTS_FILE_VAR: &str = "VIP_CLIENTS_FILE";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("VIP_BIND_ADDR is not a socket address: {0}")]
    InvalidBindAddr(String),
}

/// Server settings, read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON array of bookings; the demo seed is used when unset.
    pub bookings_file: Option<PathBuf>,
    /// JSON array of clients; the demo seed is used when unset.
    pub clients_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            bookings_file: None,
            clients_file: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = non_empty(BIND_ADDR_VAR) {
            config.bind_addr = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(raw.clone()))?;
        }
        config.bookings_file = non_empty(BOOKINGS_FILE_VAR).map(PathBuf::from);
        config.clients_file = non_empty(CLIENTS_FILE_VAR).map(PathBuf::from);

        Ok(config)
    }
}
