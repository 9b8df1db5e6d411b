//! Error types for the downtime verifier.
//!
//! One enum per failure domain. "Downtime not indexed yet" and "stale
//! downtime record" are not errors; see [`crate::domain::DowntimeLookup`].

use crate::domain::{BlockHeight, BlockRange, Checkpoint, Phase, ProducerAddress, ValidatorId};
use std::fmt;
use thiserror::Error;

/// Result type alias for verification runs
pub type Result<T> = std::result::Result<T, VerificationError>;

/// Span registry fetch failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent
    #[error("request for span {index} failed: {reason}")]
    Transport { index: u64, reason: String },

    /// Success status, but the body could not be read
    #[error("failed reading span {index} response: {reason}")]
    Body { index: u64, reason: String },

    /// Registry answered with a non-success status
    #[error("span {index} returned HTTP {status}")]
    Status { index: u64, status: u16 },

    /// Body was not a span envelope
    #[error("span {index} payload could not be decoded: {reason}")]
    Decode { index: u64, reason: String },

    /// Numeric wire field did not parse
    #[error("span {index} has invalid {field} '{value}'")]
    InvalidNumber {
        index: u64,
        field: &'static str,
        value: String,
    },

    /// Start block after end block
    #[error("span {index} starts at block {start} after its end block {end}")]
    InvalidBounds { index: u64, start: u64, end: u64 },
}

impl FetchError {
    /// Whether this failure, past index 0, just means "no more spans".
    pub fn ends_iteration(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::Decode { .. }
        )
    }
}

/// Execution-layer RPC failures.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{method}: request failed: {reason}")]
    Transport { method: &'static str, reason: String },

    #[error("{method}: unexpected HTTP {status}: {body}")]
    Status {
        method: &'static str,
        status: u16,
        body: String,
    },

    #[error("{method}: response could not be decoded: {reason}")]
    Decode { method: &'static str, reason: String },

    /// Error envelope with a populated message
    #[error("{method}: RPC error {code}: {message}")]
    Remote {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("{method}: response has no result")]
    MissingResult { method: &'static str },

    #[error("{method}: '{value}' is not a 0x-prefixed hex number")]
    InvalidHex { method: &'static str, value: String },

    #[error("empty author for block {height}")]
    EmptyAuthor { height: BlockHeight },

    /// Bounded wait gave up before the chain reached the target
    #[error("chain did not reach block {target} after {attempts} polls (last seen {last_seen})")]
    WaitExhausted {
        target: BlockHeight,
        last_seen: BlockHeight,
        attempts: u32,
    },
}

/// Administrative command failures.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("could not run command on validator {validator_id}: {reason}")]
    Spawn {
        validator_id: ValidatorId,
        reason: String,
    },

    #[error("command on validator {validator_id} exited with {status}: {output}")]
    CommandFailed {
        validator_id: ValidatorId,
        status: ExitStatusText,
        output: String,
    },

    #[error("validator {validator_id} key file unusable: {reason}")]
    InvalidKeyFile {
        validator_id: ValidatorId,
        reason: String,
    },
}

/// Exit status rendered for messages; `None` means killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitStatusText(pub Option<i32>);

impl fmt::Display for ExitStatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "status {}", code),
            None => f.write_str("a signal"),
        }
    }
}

/// Calc-only estimation failures.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("calc-only command failed: {0}")]
    Admin(#[from] AdminError),

    #[error("calc-only output has no '{field}' line:\n{output}")]
    MissingField { field: &'static str, output: String },

    #[error("calc-only output has invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("calc-only range {start}..={end} is inverted")]
    InvalidRange { start: u64, end: u64 },
}

/// Real downtime submission failures.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("downtime submission for validator {validator_id} failed: {source}")]
    Rejected {
        validator_id: ValidatorId,
        #[source]
        source: AdminError,
    },
}

/// Last thing seen before reconciliation gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileObservation {
    NotYetIndexed,
    Stale {
        range: BlockRange,
        height: BlockHeight,
    },
}

impl fmt::Display for ReconcileObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetIndexed => f.write_str("downtime not indexed"),
            Self::Stale { range, height } => {
                write!(f, "stale range {} behind chain height {}", range, height)
            }
        }
    }
}

/// Authoritative downtime lookup failures.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("planned downtime lookup for validator {validator_id} failed: {reason}")]
    Transport {
        validator_id: ValidatorId,
        reason: String,
    },

    #[error("planned downtime lookup for validator {validator_id} returned HTTP {status}: {body}")]
    Status {
        validator_id: ValidatorId,
        status: u16,
        body: String,
    },

    #[error("planned downtime for validator {validator_id} could not be decoded: {reason}")]
    Decode {
        validator_id: ValidatorId,
        reason: String,
    },

    #[error("registry error {code} for validator {validator_id}: {message}")]
    Remote {
        validator_id: ValidatorId,
        code: i64,
        message: String,
    },

    #[error("planned downtime for validator {validator_id} has no downtime_range: {body}")]
    MissingRange {
        validator_id: ValidatorId,
        body: String,
    },

    #[error("planned downtime for validator {validator_id} has invalid {field} '{value}'")]
    InvalidNumber {
        validator_id: ValidatorId,
        field: &'static str,
        value: String,
    },

    #[error("planned downtime for validator {validator_id} is inverted: {start}..={end}")]
    InvalidRange {
        validator_id: ValidatorId,
        start: u64,
        end: u64,
    },

    #[error("chain height unavailable during reconciliation: {0}")]
    Rpc(#[from] RpcError),

    #[error("no current downtime for validator {validator_id} after {attempts} attempts ({last})")]
    Exhausted {
        validator_id: ValidatorId,
        attempts: u32,
        last: ReconcileObservation,
    },
}

/// Author assertion failures.
#[derive(Debug, Error)]
pub enum CheckpointViolation {
    #[error("checkpoint {checkpoint}: no span covers block {height}")]
    NoExpectedProducer {
        checkpoint: Checkpoint,
        height: BlockHeight,
    },

    #[error("checkpoint {checkpoint}: block {height} author mismatch: got {actual}, expected {expected}")]
    AuthorMismatch {
        checkpoint: Checkpoint,
        height: BlockHeight,
        expected: ProducerAddress,
        actual: ProducerAddress,
    },

    #[error("checkpoint {checkpoint}: block {height} was authored by downtime producer {producer}")]
    DowntimeProducerAuthored {
        checkpoint: Checkpoint,
        height: BlockHeight,
        producer: ProducerAddress,
    },
}

/// Terminal failure of a verification run.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{phase}: span registry refresh failed: {source}")]
    Registry {
        phase: Phase,
        #[source]
        source: FetchError,
    },

    #[error("{phase}: execution RPC failed: {source}")]
    Rpc {
        phase: Phase,
        #[source]
        source: RpcError,
    },

    #[error("resolve-target: producer address of validator {validator_id} unavailable: {source}")]
    TargetAddress {
        validator_id: ValidatorId,
        #[source]
        source: AdminError,
    },

    #[error("estimate: {0}")]
    Estimation(#[from] EstimationError),

    #[error("submit: {0}")]
    Submission(#[from] SubmissionError),

    #[error("reconcile: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("locate-span: no span covers estimated start block {height} after {attempts} refreshes")]
    NoCoveringSpan { height: BlockHeight, attempts: u32 },

    #[error("invalid downtime window {range}: {reason}")]
    InvalidWindow { range: BlockRange, reason: String },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointViolation),
}

impl VerificationError {
    /// Phase the run was in when it failed.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Config(_) => None,
            Self::Registry { phase, .. } | Self::Rpc { phase, .. } => Some(*phase),
            Self::TargetAddress { .. } => Some(Phase::ResolveTarget),
            Self::Estimation(_) => Some(Phase::Estimate),
            Self::Submission(_) => Some(Phase::Submit),
            Self::Reconcile(_) | Self::InvalidWindow { .. } => Some(Phase::Reconcile),
            Self::NoCoveringSpan { .. } => Some(Phase::LocateSpan),
            Self::Checkpoint(violation) => Some(Phase::Checkpoint(violation.checkpoint())),
        }
    }
}

impl CheckpointViolation {
    pub fn checkpoint(&self) -> Checkpoint {
        match self {
            Self::NoExpectedProducer { checkpoint, .. }
            | Self::AuthorMismatch { checkpoint, .. }
            | Self::DowntimeProducerAuthored { checkpoint, .. } => *checkpoint,
        }
    }
}
