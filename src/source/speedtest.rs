use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use tracing::{debug, info};

use crate::config::SpeedTestConfig;

use super::{DataSource, DataSourceResult, Error, Measurement};

/// The tool prints its numbers either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Float(f64),

    Text(String),
}

fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Number::deserialize(deserializer)? {
        Number::Float(f) => Ok(f),
        Number::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

#[derive(Deserialize, Debug)]
struct ReportServer {
    sponsor: String,
}

#[derive(Deserialize, Debug)]
struct Report {
    #[serde(deserialize_with = "number")]
    download: f64,

    #[serde(deserialize_with = "number")]
    upload: f64,

    // top-level ping, not server.latency
    #[serde(deserialize_with = "number")]
    ping: f64,

    server: ReportServer,
}

fn check(name: &'static str, value: f64) -> DataSourceResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidValue(name, value))
    }
}

fn decode(output: &str, taken_at: DateTime<Utc>) -> DataSourceResult<Measurement> {
    let report: Report = serde_json::from_str(output.trim()).map_err(Error::Decode)?;

    Ok(Measurement {
        download: check("download", report.download)?,
        upload: check("upload", report.upload)?,
        ping: check("ping", report.ping)?,
        server: report.server.sponsor,
        taken_at,
    })
}

/// Runs the external `SpeedTest` binary with JSON output.
pub struct SpeedTest {
    command: String,

    server: Option<String>,
}

impl SpeedTest {
    pub fn new(config: SpeedTestConfig) -> Self {
        Self {
            command: config.command,
            server: config.server,
        }
    }

    fn args(&self) -> Vec<&str> {
        let mut args = vec!["--output", "json"];

        if let Some(server) = &self.server {
            args.push("--test-server");
            args.push(server);
        }

        args
    }
}

impl DataSource for SpeedTest {
    fn collect(&self) -> DataSourceResult<Measurement> {
        let args = self.args();
        info!(command = self.command.as_str(), "running speed test");
        debug!(?args, "speed test arguments");

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .map_err(|e| Error::Spawn(e, self.command.clone()))?;

        if !output.status.success() {
            return Err(Error::Failed(
                self.command.clone(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8(output.stdout).map_err(Error::Encoding)?;
        decode(&stdout, Utc::now())
    }
}
