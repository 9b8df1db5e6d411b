//! Downtime window estimation, submission and reconciliation.

use super::poller::ChainPoller;
use crate::domain::{
    BlockRange, DowntimeLookup, DowntimeRequest, ProducerAddress, RetryPolicy, ValidatorId,
};
use crate::error::{EstimationError, ReconcileError, ReconcileObservation, SubmissionError};
use crate::ports::{DowntimeRegistry, ValidatorAdmin};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a wall-clock downtime request into the block range the registry
/// actually recorded.
pub struct DowntimeReconciler {
    admin: Arc<dyn ValidatorAdmin>,
    registry: Arc<dyn DowntimeRegistry>,
    poller: ChainPoller,
}

impl DowntimeReconciler {
    pub fn new(
        admin: Arc<dyn ValidatorAdmin>,
        registry: Arc<dyn DowntimeRegistry>,
        poller: ChainPoller,
    ) -> Self {
        Self {
            admin,
            registry,
            poller,
        }
    }

    /// Advisory range from a calc-only submission on `validator_id`.
    pub async fn estimate(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<BlockRange, EstimationError> {
        let range = self
            .admin
            .estimate_downtime(validator_id, request, producer)
            .await?;
        info!(validator_id, %request, estimated = %range, "downtime estimated");
        Ok(range)
    }

    /// Submit the downtime for real through the producer's own validator.
    pub async fn submit(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<(), SubmissionError> {
        self.admin
            .submit_downtime(validator_id, request, producer)
            .await?;
        info!(validator_id, %producer, %request, "downtime submitted");
        Ok(())
    }

    /// One lookup of the recorded downtime.
    pub async fn fetch_authoritative(
        &self,
        validator_id: ValidatorId,
    ) -> Result<DowntimeLookup, ReconcileError> {
        self.registry.planned_downtime(validator_id).await
    }

    /// Retry [`Self::fetch_authoritative`] until a current range is recorded.
    ///
    /// A range whose start is below the chain height read right after the
    /// lookup is stale and retried, as is "not indexed yet".
    pub async fn await_authoritative(
        &self,
        validator_id: ValidatorId,
        policy: &RetryPolicy,
    ) -> Result<BlockRange, ReconcileError> {
        let mut attempt = 1u32;
        loop {
            let observation = match self.fetch_authoritative(validator_id).await? {
                DowntimeLookup::Recorded(range) => {
                    let height = self.poller.current_height().await?;
                    if range.start >= height {
                        info!(validator_id, %range, height, attempt, "authoritative downtime recorded");
                        return Ok(range);
                    }
                    warn!(validator_id, %range, height, "recorded downtime is stale");
                    ReconcileObservation::Stale { range, height }
                }
                DowntimeLookup::NotYetIndexed => {
                    debug!(validator_id, attempt, "downtime not indexed yet");
                    ReconcileObservation::NotYetIndexed
                }
            };

            if !policy.allows(attempt + 1) {
                return Err(ReconcileError::Exhausted {
                    validator_id,
                    attempts: attempt,
                    last: observation,
                });
            }
            attempt += 1;
            policy.pause().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::ports::{MockChainReader, MockDowntimeRegistry, MockValidatorAdmin};

    fn reconciler(
        script: Vec<DowntimeLookup>,
        chain_height: u64,
    ) -> (DowntimeReconciler, Arc<MockDowntimeRegistry>) {
        let registry = Arc::new(MockDowntimeRegistry::new(script));
        let chain = Arc::new(MockChainReader::new(chain_height, 0));
        let admin = Arc::new(MockValidatorAdmin::new());
        (
            DowntimeReconciler::new(admin, registry.clone(), ChainPoller::new(chain)),
            registry,
        )
    }

    #[tokio::test]
    async fn test_not_found_three_times_then_success() {
        let range = BlockRange::new(142, 158).unwrap();
        let (rec, registry) = reconciler(
            vec![
                DowntimeLookup::NotYetIndexed,
                DowntimeLookup::NotYetIndexed,
                DowntimeLookup::NotYetIndexed,
                DowntimeLookup::Recorded(range),
            ],
            120,
        );

        let got = rec
            .await_authoritative(2, &RetryPolicy::immediate(Some(5)))
            .await
            .unwrap();

        assert_eq!(got, range);
        assert_eq!(registry.call_count(), 4);
    }

    #[tokio::test]
    async fn test_stale_range_never_accepted() {
        let stale = BlockRange::new(100, 110).unwrap();
        let (rec, registry) = reconciler(vec![DowntimeLookup::Recorded(stale)], 130);

        let err = rec
            .await_authoritative(2, &RetryPolicy::immediate(Some(5)))
            .await
            .unwrap_err();

        assert_eq!(registry.call_count(), 5);
        match err {
            ReconcileError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 5);
                assert_eq!(last, ReconcileObservation::Stale { range: stale, height: 130 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_equal_to_height_is_current() {
        let range = BlockRange::new(130, 140).unwrap();
        let (rec, _) = reconciler(vec![DowntimeLookup::Recorded(range)], 130);
        let got = rec
            .await_authoritative(2, &RetryPolicy::immediate(Some(1)))
            .await
            .unwrap();
        assert_eq!(got, range);
    }

    #[tokio::test]
    async fn test_exhausted_while_not_indexed() {
        let (rec, _) = reconciler(Vec::new(), 130);
        let err = rec
            .await_authoritative(7, &RetryPolicy::immediate(Some(2)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Exhausted {
                validator_id: 7,
                attempts: 2,
                last: ReconcileObservation::NotYetIndexed,
            }
        ));
    }

    #[tokio::test]
    async fn test_registry_error_is_not_retried() {
        let registry = Arc::new(
            MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(
                BlockRange::new(142, 158).unwrap(),
            )])
            .failing_on_call(
                1,
                ReconcileError::Remote {
                    validator_id: 2,
                    code: 13,
                    message: "internal error".to_string(),
                },
            ),
        );
        let rec = DowntimeReconciler::new(
            Arc::new(MockValidatorAdmin::new()),
            registry.clone(),
            ChainPoller::new(Arc::new(MockChainReader::new(120, 0))),
        );

        let err = rec
            .await_authoritative(2, &RetryPolicy::immediate(Some(5)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Remote {
                validator_id: 2,
                code: 13,
                ..
            }
        ));
        assert_eq!(registry.call_count(), 1);
    }

    #[tokio::test]
    async fn test_height_failure_during_staleness_check_is_not_retried() {
        let registry = Arc::new(MockDowntimeRegistry::new(vec![DowntimeLookup::Recorded(
            BlockRange::new(142, 158).unwrap(),
        )]));
        let chain = Arc::new(MockChainReader::new(120, 0).failing_on_read(1));
        let rec = DowntimeReconciler::new(
            Arc::new(MockValidatorAdmin::new()),
            registry.clone(),
            ChainPoller::new(chain.clone()),
        );

        let err = rec
            .await_authoritative(2, &RetryPolicy::immediate(Some(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Rpc(RpcError::MissingResult { .. })));
        assert_eq!(registry.call_count(), 1);
        assert_eq!(chain.read_count(), 1);
    }

    #[tokio::test]
    async fn test_estimate_passes_admin_failure_through() {
        let (rec, _) = reconciler(Vec::new(), 130);
        let now = chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let request = DowntimeRequest::starting_in(
            now,
            std::time::Duration::from_secs(180),
            std::time::Duration::from_secs(180),
        )
        .unwrap();

        let err = rec
            .estimate(1, &request, &ProducerAddress::new("0xa1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EstimationError::MissingField { .. }));
    }
}
