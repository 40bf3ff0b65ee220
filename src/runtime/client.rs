use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::debug;

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
const ERROR_TYPE_HEADER: &str = "lambda-runtime-function-error-type";

/// One invocation handed out by the runtime API.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub payload: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Self {
        Self {
            // Long polling on /next must not time out.
            http: reqwest::Client::new(),
            base_url: format!("http://{api}/{API_VERSION}/runtime"),
        }
    }

    /// Builds a client from the `AWS_LAMBDA_RUNTIME_API` environment variable.
    pub fn from_env() -> Result<Self> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .context("AWS_LAMBDA_RUNTIME_API must be set to serve invocations")?;
        Ok(Self::new(&api))
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Blocks until the next invocation is available.
    pub async fn next_invocation(&self) -> Result<Invocation> {
        let resp = self
            .http
            .get(format!("{}/invocation/next", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let request_id = request_id(resp.headers())?;
        let deadline = deadline(resp.headers());
        let payload = resp.bytes().await?;
        debug!(request_id = %request_id, bytes = payload.len(), "Invocation received");

        Ok(Invocation {
            request_id,
            deadline,
            payload,
        })
    }

    pub async fn post_response(&self, request_id: &str, response: &impl Serialize) -> Result<()> {
        self.http
            .post(format!("{}/invocation/{request_id}/response", self.base_url))
            .json(response)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("posting response for {request_id} failed"))?;
        Ok(())
    }

    pub async fn post_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<()> {
        self.send_error(
            format!("{}/invocation/{request_id}/error", self.base_url),
            error_type,
            message,
        )
        .await
        .with_context(|| format!("posting error for {request_id} failed"))
    }

    /// Reports a failure that happened before the first invocation.
    pub async fn post_init_error(&self, error_type: &str, message: &str) -> Result<()> {
        let url = format!("{}/init/error", self.base_url);
        self.send_error(url, error_type, message)
            .await
            .context("posting init error failed")
    }

    async fn send_error(&self, url: String, error_type: &str, message: &str) -> Result<()> {
        self.http
            .post(url)
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&ErrorBody {
                error_message: message,
                error_type,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn request_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invocation is missing the {REQUEST_ID_HEADER} header"))
}

fn deadline(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(DEADLINE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}
