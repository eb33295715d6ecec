use chrono::{DateTime, Utc};
use reqwest::{blocking::Response, StatusCode, Url};
use rinfluxdb::line_protocol::{FieldValue, Line, LineBuilder};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    config::DatabaseConfig,
    point::{Point, Points},
};

mod influxdb;
mod influxdb_v1;

pub use influxdb::InfluxDb;
pub use influxdb_v1::InfluxDbV1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid url {0}: {1}")]
    Url(String, String),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure of a single database call. Only `TargetNotFound` is recovered
/// from, everything else drops the batch.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{0} does not exist")]
    TargetNotFound(String),

    #[error("failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request resulted in a non-success status code {0} with error: {1}")]
    Status(StatusCode, String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl WriteError {
    fn from_response(response: Response) -> Self {
        let status = response.status();
        let text = response
            .text()
            .unwrap_or_else(|_| "Failed to retrieve response text".to_string());

        WriteError::Status(status, text)
    }
}

/// A time-series database able to store line protocol batches into a single
/// target (database or bucket).
pub trait Database {
    fn target(&self) -> String;

    fn write(&self, body: &str) -> Result<(), WriteError>;

    /// Must succeed when the target already exists.
    fn create_target(&self) -> Result<(), WriteError>;
}

pub fn build(config: &DatabaseConfig) -> Result<Box<dyn Database>, Error> {
    match config {
        DatabaseConfig::V1(c) => Ok(Box::new(InfluxDbV1::new(c)?)),
        DatabaseConfig::V2(c) => Ok(Box::new(InfluxDb::new(c)?)),
    }
}

/// Parses `url` as a base that `Url::join` extends instead of replacing its
/// last path segment.
fn base_url(url: &str) -> Result<Url, Error> {
    let mut base = Url::parse(url).map_err(|e| Error::Url(url.to_string(), e.to_string()))?;

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok(base)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, WriteError> {
    base.join(path)
        .map_err(|e| WriteError::Rejected(format!("invalid endpoint {path}: {e}")))
}

fn line(point: &Point, timestamp: DateTime<Utc>) -> Line {
    let mut builder = LineBuilder::new(point.name.clone());

    for (k, v) in &point.tags {
        builder = builder.insert_tag(k.clone(), v.clone());
    }

    for (k, v) in &point.fields {
        builder = builder.insert_field(k.clone(), FieldValue::Float(*v));
    }

    builder
        .set_timestamp(point.timestamp.unwrap_or(timestamp))
        .build()
}

pub fn encode(points: &Points) -> String {
    let utc_now = Utc::now();

    points
        .iter()
        .map(|p| line(p, utc_now).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,

    /// The target was missing, got created, and the retried write went
    /// through.
    Provisioned,

    Dropped,
}

/// Writes batches through a database handle held for the whole process
/// lifetime.
pub struct Writer {
    database: Box<dyn Database>,

    verbose: bool,
}

impl Writer {
    pub fn new(database: Box<dyn Database>, verbose: bool) -> Self {
        Self { database, verbose }
    }

    /// Never fails: errors are logged and the batch is dropped.
    pub fn write(&self, points: &Points) -> WriteOutcome {
        if points.is_empty() {
            debug!("no points to write");
            return WriteOutcome::Written;
        }

        if self.verbose {
            match serde_json::to_string(points) {
                Ok(json) => info!(points = json.as_str(), "writing points"),
                Err(e) => warn!(error = %e, "unable to display points"),
            }
        }

        let body = encode(points);
        debug!("sending {} points", points.len());

        match self.try_write(&body) {
            Ok(outcome) => {
                if self.verbose {
                    info!(database = %self.database.target(), "written to InfluxDB");
                }
                outcome
            }
            Err(e) => {
                error!(
                    database = %self.database.target(),
                    error = %e,
                    "failed to write to InfluxDB"
                );
                WriteOutcome::Dropped
            }
        }
    }

    fn try_write(&self, body: &str) -> Result<WriteOutcome, WriteError> {
        match self.database.write(body) {
            Ok(()) => Ok(WriteOutcome::Written),
            Err(WriteError::TargetNotFound(target)) => {
                warn!(database = target.as_str(), "target does not exist, attempting to create");

                self.database.create_target()?;
                self.database.write(body)?;

                Ok(WriteOutcome::Provisioned)
            }
            Err(e) => Err(e),
        }
    }
}
