use reqwest::{
    blocking::{Client, RequestBuilder},
    StatusCode, Url,
};
use serde::Deserialize;
use tracing::info;

use crate::config::InfluxDbV1Config;

use super::{base_url, endpoint, Database, Error, WriteError};

#[derive(Deserialize, Debug)]
struct StatementResult {
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,

    error: Option<String>,
}

impl QueryResponse {
    fn error(self) -> Option<String> {
        self.error
            .or_else(|| self.results.into_iter().find_map(|r| r.error))
    }
}

/// InfluxDB 1.x, addressed by database name.
pub struct InfluxDbV1 {
    client: Client,

    base: Url,

    database: String,

    username: String,

    password: String,
}

impl InfluxDbV1 {
    pub fn new(config: &InfluxDbV1Config) -> Result<Self, Error> {
        let scheme = if config.ssl { "https" } else { "http" };
        let base = base_url(&format!("{scheme}://{}:{}", config.host, config.port))?;

        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            base,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.query(&[("u", &self.username), ("p", &self.password)])
        }
    }
}

impl Database for InfluxDbV1 {
    fn target(&self) -> String {
        format!("database {}", self.database)
    }

    fn write(&self, body: &str) -> Result<(), WriteError> {
        let request = self
            .client
            .post(endpoint(&self.base, "write")?)
            .query(&[("db", &self.database)])
            .body(body.to_string());

        let response = self
            .authenticated(request)
            .send()
            .map_err(WriteError::Request)?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(WriteError::TargetNotFound(self.target())),
            _ => Err(WriteError::from_response(response)),
        }
    }

    fn create_target(&self) -> Result<(), WriteError> {
        info!(database = self.database.as_str(), "creating database");

        let statement = format!("CREATE DATABASE \"{}\"", self.database.replace('"', "\\\""));
        let request = self
            .client
            .post(endpoint(&self.base, "query")?)
            .query(&[("q", statement)]);

        let response = self
            .authenticated(request)
            .send()
            .map_err(WriteError::Request)?;

        if !response.status().is_success() {
            return Err(WriteError::from_response(response));
        }

        // statement errors come back with a 200
        match response
            .json::<QueryResponse>()
            .map_err(WriteError::Request)?
            .error()
        {
            Some(error) => Err(WriteError::Rejected(error)),
            None => Ok(()),
        }
    }
}
