//! Heimdall REST adapter: published spans and recorded planned downtime.

use super::http::{body_text, build_client, normalize_base_url};
use crate::domain::{BlockRange, DowntimeLookup, SpanPayload, SpanResponse, ValidatorId};
use crate::error::{FetchError, ReconcileError};
use crate::ports::{DowntimeRegistry, SpanSource};
use crate::NO_PLANNED_DOWNTIME;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Deserialize)]
struct PlannedDowntimeResponse {
    #[serde(default)]
    downtime_range: Option<DowntimeRangeWire>,
    #[serde(default)]
    error: Option<RegistryErrorWire>,
}

#[derive(Debug, Default, Deserialize)]
struct DowntimeRangeWire {
    #[serde(default)]
    start_block: String,
    #[serde(default)]
    end_block: String,
}

#[derive(Debug, Deserialize)]
struct RegistryErrorWire {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

fn is_not_found(text: &str) -> bool {
    text.to_ascii_lowercase().contains(NO_PLANNED_DOWNTIME)
}

/// Client for the Heimdall REST API.
#[derive(Clone)]
pub struct HeimdallRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl HeimdallRestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn span_url(&self, index: u64) -> String {
        format!("{}/bor/spans/{}", self.base_url, index)
    }

    fn downtime_url(&self, validator_id: ValidatorId) -> String {
        format!(
            "{}/bor/producers/planned-downtime/{}",
            self.base_url, validator_id
        )
    }
}

#[async_trait]
impl SpanSource for HeimdallRestClient {
    async fn fetch_span(&self, index: u64) -> Result<SpanPayload, FetchError> {
        let url = self.span_url(index);
        trace!(%url, "fetching span");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                index,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                index,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            index,
            reason: e.to_string(),
        })?;

        serde_json::from_str::<SpanResponse>(&body)
            .map(|envelope| envelope.span)
            .map_err(|e| FetchError::Decode {
                index,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl DowntimeRegistry for HeimdallRestClient {
    async fn planned_downtime(
        &self,
        validator_id: ValidatorId,
    ) -> Result<DowntimeLookup, ReconcileError> {
        let url = self.downtime_url(validator_id);
        let transport = |e: reqwest::Error| ReconcileError::Transport {
            validator_id,
            reason: e.to_string(),
        };

        let response = self.http.get(&url).send().await.map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = body_text(response).await;
            if is_not_found(&body) {
                return Ok(DowntimeLookup::NotYetIndexed);
            }
            return Err(ReconcileError::Status {
                validator_id,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(transport)?;
        let parsed: PlannedDowntimeResponse =
            serde_json::from_str(&body).map_err(|e| ReconcileError::Decode {
                validator_id,
                reason: format!("{}; body: {}", e, body.trim()),
            })?;

        if let Some(error) = parsed.error.filter(|e| !e.message.is_empty()) {
            if is_not_found(&error.message) {
                return Ok(DowntimeLookup::NotYetIndexed);
            }
            return Err(ReconcileError::Remote {
                validator_id,
                code: error.code,
                message: error.message,
            });
        }

        let range = parsed.downtime_range.unwrap_or_default();
        if range.start_block.is_empty() || range.end_block.is_empty() {
            return Err(ReconcileError::MissingRange {
                validator_id,
                body: body.trim().to_string(),
            });
        }

        let parse = |field: &'static str, value: &str| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ReconcileError::InvalidNumber {
                    validator_id,
                    field,
                    value: value.to_string(),
                })
        };
        let start = parse("start_block", &range.start_block)?;
        let end = parse("end_block", &range.end_block)?;

        BlockRange::new(start, end)
            .map(DowntimeLookup::Recorded)
            .ok_or(ReconcileError::InvalidRange {
                validator_id,
                start,
                end,
            })
    }
}
