//! Shared fixtures for the verification scenarios.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use downtime_verifier::domain::SpanPayload;
use downtime_verifier::ports::{
    FixedClock, MockChainReader, MockDowntimeRegistry, MockSpanSource, MockValidatorAdmin,
};
use downtime_verifier::{OrchestratorDeps, RetryPolicy, VerifierConfig};
use std::sync::Arc;

pub const A1: &str = "0xA1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1";
pub const A2: &str = "0xA2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2";
pub const A3: &str = "0xA3A3A3A3A3A3A3A3A3A3A3A3A3A3A3A3A3A3A3A3";

/// Zero-latency polling with small attempt bounds.
pub fn fast_config() -> VerifierConfig {
    VerifierConfig {
        height_poll: RetryPolicy::immediate(None),
        span_retry: RetryPolicy::immediate(Some(4)),
        reconcile_retry: RetryPolicy::immediate(Some(5)),
        ..VerifierConfig::default()
    }
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
    ))
}

/// Rotation before the downtime: V1 then V2.
pub fn initial_spans() -> Vec<SpanPayload> {
    vec![
        SpanPayload::single(0, 0, 99, 1, A1),
        SpanPayload::single(1, 100, 199, 2, A2),
    ]
}

/// Spans the registry publishes once V2's downtime is accepted.
pub fn replanned_spans() -> Vec<SpanPayload> {
    vec![
        SpanPayload::single(2, 142, 158, 3, A3),
        SpanPayload::single(3, 159, 299, 2, A2),
    ]
}

/// Chain at height 130 advancing one block per height read; V3 authors the
/// window 142..=158 and V2 everything else.
pub fn honoring_chain() -> Arc<MockChainReader> {
    let chain = MockChainReader::new(130, 1).with_default_author(A2);
    for height in 142..=158 {
        chain.set_author(height, A3);
    }
    Arc::new(chain)
}

pub fn deps(
    spans: MockSpanSource,
    downtime: Arc<MockDowntimeRegistry>,
    chain: Arc<MockChainReader>,
    admin: MockValidatorAdmin,
) -> OrchestratorDeps {
    OrchestratorDeps {
        spans: Arc::new(spans),
        downtime,
        chain,
        admin: Arc::new(admin),
        clock: clock(),
    }
}
