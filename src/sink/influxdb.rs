use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::AUTHORIZATION,
    StatusCode, Url,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::InfluxDbV2Config;

use super::{base_url, endpoint, Database, Error, WriteError};

type SinkResult = Result<(), WriteError>;

#[derive(Deserialize, Debug)]
struct Organization {
    id: String,
}

#[derive(Deserialize, Debug)]
struct Organizations {
    #[serde(default)]
    orgs: Vec<Organization>,
}

#[derive(Serialize, Debug)]
struct CreateBucket<'a> {
    #[serde(rename = "orgID")]
    org_id: &'a str,

    name: &'a str,

    #[serde(rename = "retentionRules")]
    retention_rules: Vec<serde_json::Value>,
}

/// InfluxDB 2.x, addressed by bucket and organization.
pub struct InfluxDb {
    client: Client,

    host: Url,

    token: String,

    org: String,

    bucket: String,
}

impl InfluxDb {
    pub fn new(config: &InfluxDbV2Config) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().build().map_err(Error::Client)?,

            host: base_url(&config.url)?,

            token: config.token.clone(),

            org: config.org.clone(),

            bucket: config.bucket.clone(),
        })
    }

    fn request(&self, request: RequestBuilder) -> Result<Response, WriteError> {
        request
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .send()
            .map_err(WriteError::Request)
    }

    fn org_id(&self) -> Result<String, WriteError> {
        let response = self.request(
            self.client
                .get(endpoint(&self.host, "api/v2/orgs")?)
                .query(&[("org", &self.org)]),
        )?;

        if !response.status().is_success() {
            return Err(WriteError::from_response(response));
        }

        response
            .json::<Organizations>()
            .map_err(WriteError::Request)?
            .orgs
            .into_iter()
            .next()
            .map(|org| org.id)
            .ok_or_else(|| WriteError::Rejected(format!("organization {} not found", self.org)))
    }
}

impl Database for InfluxDb {
    fn target(&self) -> String {
        format!("bucket {} (org {})", self.bucket, self.org)
    }

    fn write(&self, body: &str) -> SinkResult {
        let response = self.request(
            self.client
                .post(endpoint(&self.host, "api/v2/write")?)
                .query(&[
                    ("org", self.org.as_str()),
                    ("bucket", self.bucket.as_str()),
                    ("precision", "ns"),
                ])
                .body(body.to_string()),
        )?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(WriteError::TargetNotFound(self.target())),
            _ => Err(WriteError::from_response(response)),
        }
    }

    fn create_target(&self) -> SinkResult {
        let org_id = self.org_id()?;
        info!(bucket = self.bucket.as_str(), org = self.org.as_str(), "creating bucket");

        let response = self.request(
            self.client
                .post(endpoint(&self.host, "api/v2/buckets")?)
                .json(&CreateBucket {
                    org_id: &org_id,
                    name: &self.bucket,
                    retention_rules: Vec::new(),
                }),
        )?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                debug!(bucket = self.bucket.as_str(), "bucket already exists");
                Ok(())
            }
            _ => Err(WriteError::from_response(response)),
        }
    }
}
