use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "COSTSHEET";

/// Runtime settings: built-in defaults overridden by `COSTSHEET_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("db_path", "data/costsheets.sqlite")?
            .set_default("log_filter", "info")?
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}
