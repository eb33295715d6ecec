use std::process::ExitStatus;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::point::Point;

pub mod speedtest;

pub const MEASUREMENT: &str = "speed_test_results";

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to run {1}: {0}")]
    Spawn(#[source] std::io::Error, String),

    #[error("{0} exited with {1}: {2}")]
    Failed(String, ExitStatus, String),

    #[error("measurement output is not UTF-8: {0}")]
    Encoding(#[source] std::string::FromUtf8Error),

    #[error("invalid measurement output: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid measurement value {1} for {0}")]
    InvalidValue(&'static str, f64),
}

pub type DataSourceResult<T> = std::result::Result<T, Error>;

/// One speed test result, in the units the measurement tool reports.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub download: f64,

    pub upload: f64,

    pub ping: f64,

    pub server: String,

    pub taken_at: DateTime<Utc>,
}

impl From<Measurement> for Point {
    fn from(m: Measurement) -> Self {
        Point::builder(MEASUREMENT)
            .field("download", m.download)
            .field("upload", m.upload)
            .field("ping", m.ping)
            .tag("server", m.server)
            .timestamp(m.taken_at)
            .build()
    }
}

pub trait DataSource {
    fn collect(&self) -> DataSourceResult<Measurement>;
}
