use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Replacement for the built-in UI page, if any.
    pub ui_index: Option<PathBuf>,
}

impl Config {
    /// Reads `HOST`, `PORT` and `CHECKOUT_UI_INDEX` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            ui_index: lookup("CHECKOUT_UI_INDEX")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }
}
