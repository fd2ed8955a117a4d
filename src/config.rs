use std::net::SocketAddr;

use thiserror::Error;

pub const DATABASE_VAR: &str = "MOTOMART_DATABASE";
pub const ADDR_VAR: &str = "MOTOMART_ADDR";
pub const JWT_SECRET_VAR: &str = "MOTOMART_JWT_SECRET";
pub const SEED_VAR: &str = "MOTOMART_SEED";

const DEFAULT_DATABASE: &str = "motomart.db";
const DEFAULT_ADDR: &str = "127.0.0.1:3004";
#[cfg(debug_assertions)]
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var} must be one of true/false/1/0, got {value}")]
    InvalidFlag { var: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Process settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub seed_demo_data: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds settings from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let database_path = get(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let addr = get(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidAddr {
            var: ADDR_VAR,
            value: addr.clone(),
        })?;

        let jwt_secret = match get(JWT_SECRET_VAR) {
            Some(secret) => secret,
            None => default_secret()?,
        };

        let seed_demo_data = match get(SEED_VAR) {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag {
                var: SEED_VAR,
                value,
            })?,
        };

        Ok(Settings {
            database_path,
            bind_addr,
            jwt_secret,
            seed_demo_data,
        })
    }
}

#[cfg(debug_assertions)]
fn default_secret() -> Result<String, ConfigError> {
    log::warn!("{} not set, using the development secret", JWT_SECRET_VAR);
    Ok(DEV_JWT_SECRET.to_string())
}

#[cfg(not(debug_assertions))]
fn default_secret() -> Result<String, ConfigError> {
    Err(ConfigError::Missing(JWT_SECRET_VAR))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
