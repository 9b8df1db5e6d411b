//! # Verification Scenarios
//!
//! End-to-end runs of the orchestrator against mock ports: the chain, the
//! registry and the validator admin are all scripted, polling is immediate.

mod common;

use common::*;
use downtime_verifier::domain::{SelectedProducer, SpanPayload};
use downtime_verifier::ports::{
    MockChainReader, MockDowntimeRegistry, MockSpanSource, MockValidatorAdmin,
};
use downtime_verifier::{
    BlockRange, Checkpoint, CheckpointViolation, DowntimeLookup, DowntimeVerification, Phase,
    ProducerAddress, ReconcileError, ReconcileObservation, VerificationError,
    VerificationOrchestrator,
};
use std::sync::Arc;

fn honoring_admin(spans: &MockSpanSource) -> MockValidatorAdmin {
    MockValidatorAdmin::new()
        .with_address(1, A1)
        .with_estimate(BlockRange::new(140, 160).unwrap())
        .publishing_on_submit(spans.clone(), replanned_spans())
}

#[tokio::test]
async fn test_downtime_honored_end_to_end() {
    let spans = MockSpanSource::new(initial_spans());
    let range = BlockRange::new(142, 158).unwrap();
    let downtime = Arc::new(MockDowntimeRegistry::new(vec![
        DowntimeLookup::NotYetIndexed,
        DowntimeLookup::NotYetIndexed,
        DowntimeLookup::NotYetIndexed,
        DowntimeLookup::Recorded(range),
    ]));
    let admin = honoring_admin(&spans);
    let mut orchestrator = VerificationOrchestrator::new(
        fast_config(),
        deps(spans, downtime.clone(), honoring_chain(), admin),
    );

    let report = orchestrator.verify().await.unwrap();

    assert_eq!(downtime.call_count(), 4);
    assert_eq!(report.target_validator_id, 1);
    assert_eq!(report.downed_validator_id, 2);
    assert_eq!(report.downed_producer, ProducerAddress::new(A2));
    assert_eq!(report.estimated_range, BlockRange::new(140, 160).unwrap());
    assert_eq!(report.authoritative_range, range);
    assert_eq!(report.estimate_drift(), (2, -2));
    assert_eq!(report.request.end_unix() - report.request.start_unix(), 180);

    let observed: Vec<_> = report
        .checkpoints
        .iter()
        .map(|r| (r.checkpoint, r.height, r.author.clone()))
        .collect();
    assert_eq!(
        observed,
        vec![
            (Checkpoint::BeforeWindow, 141, ProducerAddress::new(A2)),
            (Checkpoint::WindowStart, 142, ProducerAddress::new(A3)),
            (Checkpoint::WindowEnd, 158, ProducerAddress::new(A3)),
            (Checkpoint::AfterWindow, 159, ProducerAddress::new(A2)),
        ]
    );
    assert_eq!(report.checkpoints[1].span_id, "2");
    assert_eq!(report.checkpoints[3].span_id, "3");
}

#[tokio::test]
async fn test_submission_targets_span_producer() {
    let spans = MockSpanSource::new(initial_spans());
    let downtime = Arc::new(MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(
        BlockRange::new(142, 158).unwrap(),
    )]));
    let admin = Arc::new(honoring_admin(&spans));
    let mut orchestrator = VerificationOrchestrator::new(
        fast_config(),
        downtime_verifier::OrchestratorDeps {
            spans: Arc::new(spans),
            downtime,
            chain: honoring_chain(),
            admin: admin.clone(),
            clock: clock(),
        },
    );

    orchestrator.verify().await.unwrap();

    let submissions = admin.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].validator_id, 2);
    assert_eq!(submissions[0].producer, ProducerAddress::new(A2));
    assert_eq!(submissions[0].request.start_unix(), 1_700_000_180);
    assert_eq!(submissions[0].request.end_unix(), 1_700_000_360);
}

#[tokio::test]
async fn test_multi_producer_span_reports_no_covering_span() {
    let mut rotating = SpanPayload::single(1, 100, 199, 2, A2);
    rotating.selected_producers.push(SelectedProducer {
        val_id: "3".to_string(),
        signer: A3.to_string(),
    });
    let spans = MockSpanSource::new(vec![SpanPayload::single(0, 0, 99, 1, A1), rotating]);
    let admin = MockValidatorAdmin::new()
        .with_address(1, A1)
        .with_estimate(BlockRange::new(140, 160).unwrap());
    let mut orchestrator = VerificationOrchestrator::new(
        fast_config(),
        deps(
            spans,
            Arc::new(MockDowntimeRegistry::default()),
            honoring_chain(),
            admin,
        ),
    );

    let err = orchestrator.verify().await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::NoCoveringSpan {
            height: 140,
            attempts: 4
        }
    ));
    assert_eq!(err.phase(), Some(Phase::LocateSpan));
}

#[tokio::test]
async fn test_stale_authoritative_range_is_never_accepted() {
    let spans = MockSpanSource::new(initial_spans());
    let stale = BlockRange::new(100, 110).unwrap();
    let downtime = Arc::new(MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(stale)]));
    let admin = honoring_admin(&spans);
    let mut orchestrator = VerificationOrchestrator::new(
        fast_config(),
        deps(spans, downtime.clone(), honoring_chain(), admin),
    );

    let err = orchestrator.verify().await.unwrap_err();

    assert_eq!(downtime.call_count(), 5);
    match err {
        VerificationError::Reconcile(ReconcileError::Exhausted {
            validator_id,
            attempts,
            last: ReconcileObservation::Stale { range, height },
        }) => {
            assert_eq!(validator_id, 2);
            assert_eq!(attempts, 5);
            assert_eq!(range, stale);
            assert!(height > range.start);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_rotation_not_replanned_fails_at_window_start() {
    // Registry records the downtime but never publishes fallback spans.
    let spans = MockSpanSource::new(initial_spans());
    let downtime = Arc::new(MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(
        BlockRange::new(142, 158).unwrap(),
    )]));
    let chain = Arc::new(MockChainReader::new(130, 1).with_default_author(A2));
    let admin = MockValidatorAdmin::new()
        .with_address(1, A1)
        .with_estimate(BlockRange::new(140, 160).unwrap());
    let mut orchestrator =
        VerificationOrchestrator::new(fast_config(), deps(spans, downtime, chain, admin));

    let err = orchestrator.verify().await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::Checkpoint(CheckpointViolation::DowntimeProducerAuthored {
            checkpoint: Checkpoint::WindowStart,
            height: 142,
            ..
        })
    ));
    assert!(err.to_string().contains(&A2.to_lowercase()));
}

#[tokio::test]
async fn test_wrong_author_before_window() {
    let spans = MockSpanSource::new(initial_spans());
    let downtime = Arc::new(MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(
        BlockRange::new(142, 158).unwrap(),
    )]));
    let chain = honoring_chain();
    chain.set_author(141, A1);
    let admin = honoring_admin(&spans);
    let mut orchestrator =
        VerificationOrchestrator::new(fast_config(), deps(spans, downtime, chain, admin));

    let err = orchestrator.verify().await.unwrap_err();

    match err {
        VerificationError::Checkpoint(CheckpointViolation::AuthorMismatch {
            checkpoint,
            height,
            expected,
            actual,
        }) => {
            assert_eq!(checkpoint, Checkpoint::BeforeWindow);
            assert_eq!(height, 141);
            assert_eq!(expected, ProducerAddress::new(A2));
            assert_eq!(actual, ProducerAddress::new(A1));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_submission_is_terminal() {
    let spans = MockSpanSource::new(initial_spans());
    let downtime = Arc::new(MockDowntimeRegistry::default());
    let admin = honoring_admin(&spans).rejecting_submissions();
    let mut orchestrator = VerificationOrchestrator::new(
        fast_config(),
        deps(spans, downtime.clone(), honoring_chain(), admin),
    );

    let err = orchestrator.verify().await.unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Submit));
    assert_eq!(downtime.call_count(), 0);
}
