//! REST client for the bulk-upsert target
//!
//! Posts consolidated records as a JSON array to the endpoint configured for
//! the row kind. One request per submission; no retries. The request has no
//! timeout unless `upstream.timeout_secs` is set.

use async_trait::async_trait;
use serde_json::Value;
use sims_common::config::UpstreamConfig;
use sims_common::rows::RowKind;
use sims_common::submit::{BulkUpsert, UpstreamError};
use tracing::debug;

const USER_AGENT: &str = concat!("sims-bu/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`BulkUpsert`]
pub struct RestBulkUpsert {
    http_client: reqwest::Client,
    config: UpstreamConfig,
}

impl RestBulkUpsert {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }
}

#[async_trait]
impl BulkUpsert for RestBulkUpsert {
    async fn bulk_upsert(&self, kind: RowKind, records: &Value) -> Result<Value, UpstreamError> {
        let url = self.config.endpoint_url(kind);
        debug!(%url, %kind, "Posting bulk upsert");

        let response = self
            .http_client
            .post(&url)
            .json(records)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if status.is_success() {
            debug!(status = status.as_u16(), "Bulk upsert accepted");
            return Ok(parse_success_body(&body));
        }

        debug!(status = status.as_u16(), %body, "Bulk upsert rejected");
        Err(UpstreamError::Rejected {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

/// Success body as JSON; plain text is kept as a string, empty as null
fn parse_success_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Pull an operator-facing message out of an error payload
///
/// Recognizes `{"message": ..}`, `{"error": ".."}`, `{"error": {"message": ..}}`
/// and `{"errors": [..]}` (first entry, string or object with `message`).
pub fn extract_error_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;

    let candidate = payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .or_else(|| {
            payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
        .or_else(|| {
            payload
                .get("errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(|first| {
                    first
                        .as_str()
                        .or_else(|| first.get("message").and_then(Value::as_str))
                })
        })?;

    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
