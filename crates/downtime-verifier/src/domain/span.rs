//! Span entity and the producer resolver.
//!
//! A span is a contiguous block range with a single expected producer. The
//! authority registry publishes spans by index; later publications may cover
//! heights that an earlier span already covered, and the later one wins.

use super::address::{BlockHeight, ProducerAddress, ValidatorId};
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Envelope returned by `GET /bor/spans/{index}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpanResponse {
    pub span: SpanPayload,
}

/// Span as published by the registry, numbers still in wire (string) form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpanPayload {
    #[serde(default)]
    pub id: String,
    pub start_block: String,
    pub end_block: String,
    #[serde(default)]
    pub selected_producers: Vec<SelectedProducer>,
}

/// One entry of `selected_producers`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectedProducer {
    pub val_id: String,
    pub signer: String,
}

impl SpanPayload {
    /// Build a single-producer payload (used by mocks and tests).
    pub fn single(
        id: u64,
        start_block: BlockHeight,
        end_block: BlockHeight,
        val_id: ValidatorId,
        signer: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            start_block: start_block.to_string(),
            end_block: end_block.to_string(),
            selected_producers: vec![SelectedProducer {
                val_id: val_id.to_string(),
                signer: signer.to_string(),
            }],
        }
    }
}

/// A span usable for author prediction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub id: String,
    pub start_block: BlockHeight,
    pub end_block: BlockHeight,
    pub producer_validator_id: ValidatorId,
    pub producer_address: ProducerAddress,
}

impl Span {
    /// Convert a published payload into a span.
    ///
    /// Returns `Ok(None)` for spans that do not name exactly one producer;
    /// those are rotation-in-progress spans and cannot predict an author.
    /// Block bounds are parsed first, so malformed bounds fail the refresh
    /// even on a span that would have been skipped.
    pub fn from_payload(index: u64, payload: &SpanPayload) -> Result<Option<Self>, FetchError> {
        let start_block = parse_field(index, "start_block", &payload.start_block)?;
        let end_block = parse_field(index, "end_block", &payload.end_block)?;

        let producer = match payload.selected_producers.as_slice() {
            [only] => only,
            _ => return Ok(None),
        };

        let producer_validator_id = parse_field(index, "val_id", &producer.val_id)?;

        if start_block > end_block {
            return Err(FetchError::InvalidBounds {
                index,
                start: start_block,
                end: end_block,
            });
        }

        Ok(Some(Self {
            id: payload.id.clone(),
            start_block,
            end_block,
            producer_validator_id,
            producer_address: ProducerAddress::new(&producer.signer),
        }))
    }

    /// True if `height` falls inside this span (bounds inclusive).
    pub fn covers(&self, height: BlockHeight) -> bool {
        self.start_block <= height && height <= self.end_block
    }
}

fn parse_field(index: u64, field: &'static str, value: &str) -> Result<u64, FetchError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| FetchError::InvalidNumber {
            index,
            field,
            value: value.to_string(),
        })
}

/// Immutable view of the span set produced by one registry refresh.
///
/// Cloning is cheap; a refresh never mutates an existing set, it builds a
/// new one and swaps it in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Arc<Vec<Span>>,
}

impl SpanSet {
    /// Wrap spans in fetch order.
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            spans: Arc::new(spans),
        }
    }

    /// Resolve the span expected to produce `height`.
    ///
    /// Scans from the most recently fetched span backwards and returns the
    /// first one covering the height.
    pub fn resolve_expected_producer(&self, height: BlockHeight) -> Option<&Span> {
        self.spans.iter().rev().find(|span| span.covers(height))
    }

    /// Spans in fetch order.
    pub fn as_slice(&self) -> &[Span] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
