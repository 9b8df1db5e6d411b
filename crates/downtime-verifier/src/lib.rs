//! # Downtime Verifier
//!
//! **Bounded Context:** Producer rotation & planned downtime
//! **Architecture:** Hexagonal (domain / ports / adapters / service)
//!
//! ## Purpose
//!
//! Verifies from the outside that a planned producer downtime is honored by
//! the span rotation:
//! - reads the published spans from the Heimdall REST API
//! - estimates and submits a downtime window through the validator CLI
//! - reads back the authoritative block range once it is recorded
//! - asserts the recorded Bor block authors at the four window boundaries
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Adapters (Outer)                                   │
//! │  - Heimdall REST: spans, planned downtime           │
//! │  - Bor JSON-RPC: latest height, block author        │
//! │  - Heimdall CLI over a shell template               │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports (Middle)                                     │
//! │  - Inbound: DowntimeVerification                    │
//! │  - Outbound: SpanSource, DowntimeRegistry,          │
//! │    ChainReader, ValidatorAdmin, CommandRunner       │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (Inner - Pure Logic)                        │
//! │  - SpanSet + producer resolution                    │
//! │  - BlockRange, DowntimeRequest, RetryPolicy         │
//! │  - Checkpoint assertions                            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Critical Invariants
//!
//! 1. **Span Bounds**: every kept span has `start_block <= end_block`
//! 2. **Single Producer**: spans naming more than one producer are skipped
//! 3. **Latest Wins**: overlapping spans resolve to the most recently fetched
//! 4. **Fresh Window**: an authoritative range starting below the chain height
//!    observed at check time is never accepted
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let mut verifier = VerificationOrchestrator::new(config, deps);
//! let report = verifier.verify().await?;
//! println!("downtime {} verified", report.authoritative_range);
//! ```

#![warn(clippy::all)]

/// External integrations (HTTP, JSON-RPC, shell)
pub mod adapters;
/// Domain models and pure logic
pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;

pub use config::VerifierConfig;
pub use error::{
    AdminError, CheckpointViolation, EstimationError, ExitStatusText, FetchError,
    ReconcileError, ReconcileObservation, Result, RpcError, SubmissionError, VerificationError,
};

pub use domain::{
    BlockHeight, BlockRange, Checkpoint, CheckpointRecord, DowntimeLookup, DowntimeRequest,
    Phase, ProducerAddress, RetryPolicy, Span, SpanSet, ValidatorId,
};

pub use ports::{
    ChainReader, Clock, CommandRunner, DowntimeRegistry, DowntimeVerification, SpanSource,
    ValidatorAdmin, VerificationReport,
};

pub use service::{
    ChainPoller, DowntimeReconciler, OrchestratorDeps, SpanRegistry, VerificationOrchestrator,
};

/// Chain height below which span data may not exist yet.
pub const DEFAULT_MIN_START_BLOCK: BlockHeight = 128;

/// Phrase in the registry's error message when no downtime is recorded.
pub const NO_PLANNED_DOWNTIME: &str = "no planned downtime found for producer id";
