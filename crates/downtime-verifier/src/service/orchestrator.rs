//! Verification orchestrator.
//!
//! Runs the protocol as a strict sequence:
//!
//! 1. wait for the minimum chain height
//! 2. resolve the target validator's producer address
//! 3. estimate the downtime window
//! 4. locate the span covering the estimated start
//! 5. submit the downtime for that span's producer
//! 6. reconcile the authoritative range
//! 7. assert authors at `start - 1`, `start`, `end` and `end + 1`
//!
//! Every failure is terminal.

use super::poller::ChainPoller;
use super::reconciler::DowntimeReconciler;
use super::registry::SpanRegistry;
use crate::config::VerifierConfig;
use crate::domain::{
    BlockHeight, BlockRange, Checkpoint, CheckpointRecord, DowntimeRequest, Phase,
    ProducerAddress, Span,
};
use crate::error::{Result, VerificationError};
use crate::ports::{
    ChainReader, Clock, DowntimeRegistry, DowntimeVerification, SpanSource, ValidatorAdmin,
    VerificationReport,
};
use async_trait::async_trait;
use std::sync::Arc;
use verifier_telemetry::{log_block_event, log_phase};

/// Outbound ports the orchestrator is wired with.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub spans: Arc<dyn SpanSource>,
    pub downtime: Arc<dyn DowntimeRegistry>,
    pub chain: Arc<dyn ChainReader>,
    pub admin: Arc<dyn ValidatorAdmin>,
    pub clock: Arc<dyn Clock>,
}

/// Drives one planned-downtime verification run.
pub struct VerificationOrchestrator {
    config: VerifierConfig,
    registry: SpanRegistry,
    poller: ChainPoller,
    reconciler: DowntimeReconciler,
    admin: Arc<dyn ValidatorAdmin>,
    clock: Arc<dyn Clock>,
}

impl VerificationOrchestrator {
    pub fn new(config: VerifierConfig, deps: OrchestratorDeps) -> Self {
        let poller = ChainPoller::new(deps.chain);
        Self {
            registry: SpanRegistry::new(deps.spans),
            reconciler: DowntimeReconciler::new(
                deps.admin.clone(),
                deps.downtime,
                poller.clone(),
            ),
            poller,
            admin: deps.admin,
            clock: deps.clock,
            config,
        }
    }

    async fn wait_for(&self, phase: Phase, target: BlockHeight) -> Result<BlockHeight> {
        log_phase!(debug, phase, "waiting for block", target_height = target);
        self.poller
            .wait_for_height(target, &self.config.height_poll)
            .await
            .map_err(|source| VerificationError::Rpc { phase, source })
    }

    async fn refresh_spans(&mut self, phase: Phase) -> Result<()> {
        self.registry
            .refresh()
            .await
            .map_err(|source| VerificationError::Registry { phase, source })
    }

    async fn resolve_target(&self) -> Result<ProducerAddress> {
        let validator_id = self.config.target_validator_id;
        let address = self
            .admin
            .producer_address(validator_id)
            .await
            .map_err(|source| VerificationError::TargetAddress {
                validator_id,
                source,
            })?;
        log_phase!(
            info,
            Phase::ResolveTarget,
            "target producer resolved",
            validator_id,
            producer = %address
        );
        Ok(address)
    }

    /// Refresh spans until one covers `height`.
    async fn locate_span(&mut self, height: BlockHeight) -> Result<Span> {
        let policy = self.config.span_retry;
        let mut attempt = 1u32;
        loop {
            self.refresh_spans(Phase::LocateSpan).await?;
            if let Some(span) = self.registry.resolve_expected_producer(height) {
                log_block_event!(
                    info,
                    Phase::LocateSpan,
                    "covering span found",
                    height,
                    span.producer_address,
                    span_id = %span.id,
                    validator_id = span.producer_validator_id
                );
                return Ok(span.clone());
            }

            if !policy.allows(attempt + 1) {
                return Err(VerificationError::NoCoveringSpan {
                    height,
                    attempts: attempt,
                });
            }
            log_phase!(debug, Phase::LocateSpan, "no span covers block yet", height, attempt);
            attempt += 1;
            policy.pause().await;
        }
    }

    /// Assert the author of one checkpoint block against the current spans.
    async fn check(
        &self,
        checkpoint: Checkpoint,
        range: BlockRange,
        downed: &ProducerAddress,
    ) -> Result<CheckpointRecord> {
        let phase = Phase::Checkpoint(checkpoint);
        let height = checkpoint
            .height(range)
            .ok_or_else(|| VerificationError::InvalidWindow {
                range,
                reason: format!("{} has no block height", checkpoint),
            })?;

        let author = self
            .poller
            .author_of(height)
            .await
            .map_err(|source| VerificationError::Rpc { phase, source })?;

        let record = checkpoint.verify(height, &author, &self.registry.snapshot(), downed)?;
        log_block_event!(info, phase, "checkpoint passed", height, author, span_id = %record.span_id);
        Ok(record)
    }

    async fn run(&mut self) -> Result<VerificationReport> {
        self.config.validate()?;

        // 1. Spans only exist once the chain is past the floor.
        self.wait_for(Phase::WaitMinHeight, self.config.min_start_block)
            .await?;

        // 2.
        let target_validator_id = self.config.target_validator_id;
        let target_address = self.resolve_target().await?;

        // 3.
        let request = DowntimeRequest::starting_in(
            self.clock.now(),
            self.config.downtime_start_offset(),
            self.config.downtime_duration(),
        )
        .ok_or_else(|| {
            VerificationError::Config("downtime window overflows the calendar".to_string())
        })?;
        let estimated_range = self
            .reconciler
            .estimate(target_validator_id, &request, &target_address)
            .await?;

        // 4. The downtime goes to whoever produces at the estimated start.
        let span = self.locate_span(estimated_range.start).await?;
        let downed_validator_id = span.producer_validator_id;
        let downed_producer = span.producer_address;

        // 5.
        self.reconciler
            .submit(downed_validator_id, &request, &downed_producer)
            .await?;

        // 6.
        let authoritative_range = self
            .reconciler
            .await_authoritative(downed_validator_id, &self.config.reconcile_retry)
            .await?;
        if authoritative_range.start == 0 {
            return Err(VerificationError::InvalidWindow {
                range: authoritative_range,
                reason: "window starts at genesis".to_string(),
            });
        }
        log_phase!(
            info,
            Phase::Reconcile,
            "authoritative window",
            range = %authoritative_range,
            blocks = authoritative_range.len()
        );

        // 7. Spans for the window may only be published once it is reached.
        let mut checkpoints = Vec::with_capacity(Checkpoint::ALL.len());

        let entry = Phase::Checkpoint(Checkpoint::WindowStart);
        self.wait_for(entry, authoritative_range.start).await?;
        self.refresh_spans(entry).await?;
        checkpoints.push(
            self.check(Checkpoint::BeforeWindow, authoritative_range, &downed_producer)
                .await?,
        );
        checkpoints.push(
            self.check(Checkpoint::WindowStart, authoritative_range, &downed_producer)
                .await?,
        );

        let last = Phase::Checkpoint(Checkpoint::WindowEnd);
        self.wait_for(last, authoritative_range.end).await?;
        self.refresh_spans(last).await?;
        checkpoints.push(
            self.check(Checkpoint::WindowEnd, authoritative_range, &downed_producer)
                .await?,
        );

        let after = Phase::Checkpoint(Checkpoint::AfterWindow);
        let after_height = Checkpoint::AfterWindow
            .height(authoritative_range)
            .ok_or_else(|| VerificationError::InvalidWindow {
                range: authoritative_range,
                reason: "window ends at the last representable block".to_string(),
            })?;
        self.wait_for(after, after_height).await?;
        self.refresh_spans(after).await?;
        checkpoints.push(
            self.check(Checkpoint::AfterWindow, authoritative_range, &downed_producer)
                .await?,
        );

        Ok(VerificationReport {
            target_validator_id,
            downed_validator_id,
            downed_producer,
            request,
            estimated_range,
            authoritative_range,
            checkpoints,
        })
    }
}

#[async_trait]
impl DowntimeVerification for VerificationOrchestrator {
    async fn verify(&mut self) -> Result<VerificationReport> {
        match self.run().await {
            Ok(report) => {
                log_phase!(
                    info,
                    "done",
                    "planned downtime verified",
                    downed = %report.downed_producer,
                    range = %report.authoritative_range
                );
                Ok(report)
            }
            Err(e) => {
                let phase = e
                    .phase()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "config".to_string());
                log_phase!(error, phase, "verification failed", error = %e);
                Err(e)
            }
        }
    }
}
