use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{ConfigSource, Environment, IniFile};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// INI file given by --config
    File,

    /// GENERAL_*, INFLUX_* and SPEEDTEST_* environment variables
    Env,
}

/// Send speed test results to InfluxDB
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Opts {
    /// Location of the config file
    #[clap(long, value_parser, default_value = "config.ini")]
    pub config: PathBuf,

    /// Where to read the configuration from
    #[clap(long, value_enum, default_value = "file")]
    pub source: Source,
}

impl Opts {
    pub fn parse_from_args() -> Self {
        Self::parse()
    }

    pub fn config_source(&self) -> Box<dyn ConfigSource> {
        match self.source {
            Source::File => Box::new(IniFile::new(&self.config)),
            Source::Env => Box::new(Environment::from_process()),
        }
    }
}
