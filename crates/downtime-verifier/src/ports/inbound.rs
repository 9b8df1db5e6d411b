//! Inbound ports (driving side - API)

use crate::domain::{
    BlockRange, CheckpointRecord, DowntimeRequest, ProducerAddress, ValidatorId,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Primary port: run the planned-downtime verification protocol
#[async_trait]
pub trait DowntimeVerification: Send {
    /// Run every phase to completion; any failure is terminal
    async fn verify(&mut self) -> Result<VerificationReport>;
}

/// Outcome of a successful verification run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Validator the downtime was requested for
    pub target_validator_id: ValidatorId,

    /// Validator whose span covered the estimated start (the one downed)
    pub downed_validator_id: ValidatorId,

    /// Address of the downed producer
    pub downed_producer: ProducerAddress,

    /// Requested wall-clock window
    pub request: DowntimeRequest,

    /// Advisory range from the calc-only submission
    pub estimated_range: BlockRange,

    /// Range recorded by the authority registry
    pub authoritative_range: BlockRange,

    /// Passed checkpoints in protocol order
    pub checkpoints: Vec<CheckpointRecord>,
}

impl VerificationReport {
    /// Blocks the recorded window drifted from the estimate at each end.
    pub fn estimate_drift(&self) -> (i128, i128) {
        let drift = |recorded: u64, estimated: u64| i128::from(recorded) - i128::from(estimated);
        (
            drift(self.authoritative_range.start, self.estimated_range.start),
            drift(self.authoritative_range.end, self.estimated_range.end),
        )
    }
}
