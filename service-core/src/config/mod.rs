//! Layered listener configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `configuration`
//! file in the working directory, then `<PREFIX>__*` environment variables.

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

pub const DEFAULT_ENV_PREFIX: &str = "APP";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Listener settings shared by every service binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::load_with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix(prefix).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// `host:port` for binding the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_source() {
        let config = Config::load_with_prefix("SERVICE_CORE_UNSET_PREFIX").unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        assert_eq!(config.bind_address(), "127.0.0.1:0");
    }
}
