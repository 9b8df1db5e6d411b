//! Author checkpoints around the downtime window.

use super::address::{BlockHeight, ProducerAddress};
use super::span::SpanSet;
use super::window::BlockRange;
use crate::error::CheckpointViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four block positions checked around the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Checkpoint {
    /// `start - 1`: normal rotation still holds.
    BeforeWindow,
    /// `start`: fallback producer has taken over.
    WindowStart,
    /// `end`: fallback producer still in charge.
    WindowEnd,
    /// `end + 1`: normal rotation resumed.
    AfterWindow,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::BeforeWindow,
        Checkpoint::WindowStart,
        Checkpoint::WindowEnd,
        Checkpoint::AfterWindow,
    ];

    /// Block height checked for `range`; `None` when there is no block before a
    /// window starting at genesis.
    pub fn height(&self, range: BlockRange) -> Option<BlockHeight> {
        match self {
            Checkpoint::BeforeWindow => range.start.checked_sub(1),
            Checkpoint::WindowStart => Some(range.start),
            Checkpoint::WindowEnd => Some(range.end),
            Checkpoint::AfterWindow => range.end.checked_add(1),
        }
    }

    /// Whether the downed producer must not author this block.
    pub fn requires_fallback(&self) -> bool {
        matches!(self, Checkpoint::WindowStart | Checkpoint::WindowEnd)
    }

    /// Check the recorded author of `height` against the span set.
    pub fn verify(
        &self,
        height: BlockHeight,
        actual: &ProducerAddress,
        spans: &SpanSet,
        downed: &ProducerAddress,
    ) -> Result<CheckpointRecord, CheckpointViolation> {
        let expected = spans
            .resolve_expected_producer(height)
            .ok_or(CheckpointViolation::NoExpectedProducer {
                checkpoint: *self,
                height,
            })?;

        if actual != &expected.producer_address {
            return Err(CheckpointViolation::AuthorMismatch {
                checkpoint: *self,
                height,
                expected: expected.producer_address.clone(),
                actual: actual.clone(),
            });
        }

        if self.requires_fallback() && actual == downed {
            return Err(CheckpointViolation::DowntimeProducerAuthored {
                checkpoint: *self,
                height,
                producer: downed.clone(),
            });
        }

        Ok(CheckpointRecord {
            checkpoint: *self,
            height,
            span_id: expected.id.clone(),
            author: actual.clone(),
        })
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Checkpoint::BeforeWindow => "before-window",
            Checkpoint::WindowStart => "window-start",
            Checkpoint::WindowEnd => "window-end",
            Checkpoint::AfterWindow => "after-window",
        };
        f.write_str(name)
    }
}

/// A checkpoint that passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub checkpoint: Checkpoint,
    pub height: BlockHeight,
    pub span_id: String,
    pub author: ProducerAddress,
}
