use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;
use tracing::info;

mod env;
mod file;

pub use env::Environment;
pub use file::IniFile;

pub const DEFAULT_DELAY_SECS: u64 = 2;
pub const DEFAULT_COMMAND: &str = "SpeedTest";
pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_DATABASE: &str = "speedtests";
pub const DEFAULT_URL: &str = "http://localhost:8086";

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to load config file {0}")]
    NotFound(PathBuf),

    #[error("invalid config file {1}: {0}")]
    Parse(String, PathBuf),

    #[error("missing option {0}")]
    Missing(String),

    #[error("invalid value '{1}' for option {0}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfluxDbV1Config {
    pub host: String,

    pub port: u16,

    pub database: String,

    pub username: String,

    pub password: String,

    pub ssl: bool,

    pub verify_ssl: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfluxDbV2Config {
    pub url: String,

    pub token: String,

    pub org: String,

    pub bucket: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseConfig {
    V1(InfluxDbV1Config),

    V2(InfluxDbV2Config),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedTestConfig {
    pub command: String,

    pub server: Option<String>,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            server: None,
        }
    }
}

/// Fully resolved runtime configuration. Never re-read once the collector
/// has started.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub delay: Duration,

    pub verbose: bool,

    pub database: DatabaseConfig,

    pub speedtest: SpeedTestConfig,
}

/// Somewhere a [`Config`] can be loaded from. Exactly one source is used per
/// deployment.
pub trait ConfigSource: fmt::Display {
    fn load(&self) -> Result<Config, Error>;
}

pub fn read(source: &dyn ConfigSource) -> Result<Config, Error> {
    info!(source = %source, "loading configuration");
    let config = source.load()?;
    info!(
        delay = config.delay.as_secs(),
        verbose = config.verbose,
        "configuration successfully loaded"
    );

    Ok(config)
}

/// Boolean rule shared by every source: unset or blank keeps the default,
/// `false`/`0`/`no`/`off` disable, anything else enables.
pub(crate) fn parse_flag(value: Option<&str>, default: bool) -> bool {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => return default,
    };

    !matches!(value.as_str(), "false" | "0" | "no" | "off")
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim();
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    })
}
