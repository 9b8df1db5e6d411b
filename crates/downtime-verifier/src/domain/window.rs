//! Downtime window value types.

use super::address::BlockHeight;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Inclusive block-height range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: BlockHeight,
    pub end: BlockHeight,
}

impl BlockRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: BlockHeight, end: BlockHeight) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of blocks in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Wall-clock downtime window requested by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeRequest {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

impl DowntimeRequest {
    /// Window `[now + offset, now + offset + duration]`, truncated to whole seconds.
    ///
    /// `None` if either end falls outside the representable date range.
    pub fn starting_in(now: DateTime<Utc>, offset: Duration, duration: Duration) -> Option<Self> {
        let base = DateTime::<Utc>::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let start_utc = base.checked_add_signed(whole_seconds(offset)?)?;
        let end_utc = start_utc.checked_add_signed(whole_seconds(duration)?)?;

        Some(Self { start_utc, end_utc })
    }

    /// Start as a unix timestamp in seconds.
    pub fn start_unix(&self) -> i64 {
        self.start_utc.timestamp()
    }

    /// End as a unix timestamp in seconds.
    pub fn end_unix(&self) -> i64 {
        self.end_utc.timestamp()
    }
}

fn whole_seconds(duration: Duration) -> Option<ChronoDuration> {
    ChronoDuration::try_seconds(i64::try_from(duration.as_secs()).ok()?)
}

impl fmt::Display for DowntimeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start_utc.to_rfc3339(),
            self.end_utc.to_rfc3339()
        )
    }
}

/// Result of asking the registry for a validator's recorded downtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DowntimeLookup {
    /// The registry has recorded this range.
    Recorded(BlockRange),
    /// The registry has not indexed a downtime for this validator yet.
    NotYetIndexed,
}
