//! Outbound ports (driven side - SPI)

use crate::domain::{
    BlockHeight, BlockRange, DowntimeLookup, DowntimeRequest, ProducerAddress, SpanPayload,
    ValidatorId,
};
use crate::error::{
    AdminError, EstimationError, ExitStatusText, FetchError, ReconcileError, RpcError,
    SubmissionError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Port: Read published spans from the authority registry
#[async_trait]
pub trait SpanSource: Send + Sync {
    /// Fetch the span published at `index`
    async fn fetch_span(&self, index: u64) -> Result<SpanPayload, FetchError>;
}

/// Port: Read recorded planned downtime from the authority registry
#[async_trait]
pub trait DowntimeRegistry: Send + Sync {
    /// Look up the downtime recorded for `validator_id`
    async fn planned_downtime(
        &self,
        validator_id: ValidatorId,
    ) -> Result<DowntimeLookup, ReconcileError>;
}

/// Port: Read chain state from the execution layer
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Height of the latest block
    async fn latest_block_number(&self) -> Result<BlockHeight, RpcError>;

    /// Recorded author of a finalized block
    async fn block_author(&self, height: BlockHeight) -> Result<ProducerAddress, RpcError>;
}

/// Port: Run a shell command against a validator's administrative interface
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` on `validator_id`, returning its combined output
    async fn run(&self, validator_id: ValidatorId, command: &str) -> Result<String, AdminError>;
}

/// Port: Typed administrative operations on a validator
///
/// Implementations own any text parsing of tool output; callers only see
/// parsed values.
#[async_trait]
pub trait ValidatorAdmin: Send + Sync {
    /// Address the validator signs blocks with
    async fn producer_address(
        &self,
        validator_id: ValidatorId,
    ) -> Result<ProducerAddress, AdminError>;

    /// Calculation-only downtime submission; returns the advisory block range
    async fn estimate_downtime(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<BlockRange, EstimationError>;

    /// Real downtime submission
    async fn submit_downtime(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<(), SubmissionError>;
}

/// Port: Wall clock
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock span source backed by a shared list.
///
/// Clones share the list, so a test can publish new spans while the
/// registry holds another handle. Indexes past the end answer HTTP 404.
#[derive(Clone, Default)]
pub struct MockSpanSource {
    spans: Arc<RwLock<Vec<SpanPayload>>>,
    unreadable: Option<u64>,
    fetches: Arc<AtomicU64>,
}

impl MockSpanSource {
    pub fn new(spans: Vec<SpanPayload>) -> Self {
        Self {
            spans: Arc::new(RwLock::new(spans)),
            unreadable: None,
            fetches: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Answer `index` with a success status whose body cannot be read.
    pub fn with_unreadable_body(mut self, index: u64) -> Self {
        self.unreadable = Some(index);
        self
    }

    /// Append a newly published span.
    pub fn publish(&self, payload: SpanPayload) {
        self.spans.write().push(payload);
    }

    /// Total number of fetches served.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpanSource for MockSpanSource {
    async fn fetch_span(&self, index: u64) -> Result<SpanPayload, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unreadable == Some(index) {
            return Err(FetchError::Body {
                index,
                reason: "connection reset by peer".to_string(),
            });
        }
        self.spans
            .read()
            .get(index as usize)
            .cloned()
            .ok_or(FetchError::Status { index, status: 404 })
    }
}

/// Mock downtime registry answering from a script.
///
/// The last scripted answer repeats once the script is exhausted. A failure
/// can be injected for one call; that call does not consume the script.
#[derive(Default)]
pub struct MockDowntimeRegistry {
    script: Mutex<VecDeque<DowntimeLookup>>,
    last: Mutex<Option<DowntimeLookup>>,
    failure: Mutex<Option<(u32, ReconcileError)>>,
    calls: AtomicU32,
}

impl MockDowntimeRegistry {
    pub fn new(script: Vec<DowntimeLookup>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            failure: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// Answer call number `call` (1-based) with `error`.
    pub fn failing_on_call(self, call: u32, error: ReconcileError) -> Self {
        *self.failure.lock() = Some((call, error));
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DowntimeRegistry for MockDowntimeRegistry {
    async fn planned_downtime(
        &self,
        _validator_id: ValidatorId,
    ) -> Result<DowntimeLookup, ReconcileError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut failure = self.failure.lock();
            if failure.as_ref().is_some_and(|(at, _)| *at == call) {
                if let Some((_, error)) = failure.take() {
                    return Err(error);
                }
            }
        }

        let next = self.script.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(answer) = next {
            *last = Some(answer);
        }
        Ok((*last).unwrap_or(DowntimeLookup::NotYetIndexed))
    }
}

/// Mock chain that advances `step` blocks every time its height is read.
///
/// Authors are only served for blocks at or below the last reported height.
/// One height read can be made to fail without advancing the chain.
pub struct MockChainReader {
    height: AtomicU64,
    step: u64,
    authors: RwLock<HashMap<BlockHeight, ProducerAddress>>,
    default_author: Option<ProducerAddress>,
    fail_on_read: Option<u32>,
    reads: AtomicU32,
}

impl MockChainReader {
    pub fn new(start_height: BlockHeight, step: u64) -> Self {
        Self {
            height: AtomicU64::new(start_height),
            step,
            authors: RwLock::new(HashMap::new()),
            default_author: None,
            fail_on_read: None,
            reads: AtomicU32::new(0),
        }
    }

    /// Fail height read number `read` (1-based) with a missing result.
    pub fn failing_on_read(mut self, read: u32) -> Self {
        self.fail_on_read = Some(read);
        self
    }

    /// Height reads served so far, failed ones included.
    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Author returned for blocks without an explicit entry.
    pub fn with_default_author(mut self, author: &str) -> Self {
        self.default_author = Some(ProducerAddress::new(author));
        self
    }

    pub fn set_author(&self, height: BlockHeight, author: &str) {
        self.authors.write().insert(height, ProducerAddress::new(author));
    }

    pub fn current(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn latest_block_number(&self) -> Result<BlockHeight, RpcError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_read == Some(read) {
            return Err(RpcError::MissingResult {
                method: "eth_getBlockByNumber",
            });
        }
        Ok(self.height.fetch_add(self.step, Ordering::SeqCst))
    }

    async fn block_author(&self, height: BlockHeight) -> Result<ProducerAddress, RpcError> {
        if height > self.current().saturating_sub(self.step) {
            return Err(RpcError::Remote {
                method: "bor_getAuthor",
                code: -32000,
                message: format!("block {} not found", height),
            });
        }
        self.authors
            .read()
            .get(&height)
            .cloned()
            .or_else(|| self.default_author.clone())
            .ok_or(RpcError::EmptyAuthor { height })
    }
}

/// Mock command runner answering by command substring.
///
/// The first rule whose fragment occurs in the command wins; unmatched
/// commands fail with exit status 127.
#[derive(Default)]
pub struct MockCommandRunner {
    rules: Vec<(String, std::result::Result<String, i32>)>,
    commands: Mutex<Vec<(ValidatorId, String)>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `fragment` with `output`.
    pub fn respond(mut self, fragment: &str, output: &str) -> Self {
        self.rules.push((fragment.to_string(), Ok(output.to_string())));
        self
    }

    /// Fail commands containing `fragment` with exit status `code`.
    pub fn fail(mut self, fragment: &str, code: i32) -> Self {
        self.rules.push((fragment.to_string(), Err(code)));
        self
    }

    /// Commands run so far, with the validator they targeted.
    pub fn commands(&self) -> Vec<(ValidatorId, String)> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, validator_id: ValidatorId, command: &str) -> Result<String, AdminError> {
        self.commands
            .lock()
            .push((validator_id, command.to_string()));

        let rule = self
            .rules
            .iter()
            .find(|(fragment, _)| command.contains(fragment.as_str()));
        match rule {
            Some((_, Ok(output))) => Ok(output.clone()),
            Some((_, Err(code))) => Err(AdminError::CommandFailed {
                validator_id,
                status: ExitStatusText(Some(*code)),
                output: "mock failure".to_string(),
            }),
            None => Err(AdminError::CommandFailed {
                validator_id,
                status: ExitStatusText(Some(127)),
                output: format!("command not found: {}", command),
            }),
        }
    }
}

/// Downtime submission seen by [`MockValidatorAdmin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub validator_id: ValidatorId,
    pub request: DowntimeRequest,
    pub producer: ProducerAddress,
}

/// Mock validator admin with a fixed estimate.
///
/// On submission it can publish spans to a [`MockSpanSource`], standing in
/// for the registry re-planning the rotation around the downtime.
#[derive(Default)]
pub struct MockValidatorAdmin {
    addresses: HashMap<ValidatorId, ProducerAddress>,
    estimate: Option<BlockRange>,
    reject_submission: bool,
    publish_on_submit: Option<(MockSpanSource, Vec<SpanPayload>)>,
    submissions: Mutex<Vec<RecordedSubmission>>,
}

impl MockValidatorAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, validator_id: ValidatorId, address: &str) -> Self {
        self.addresses
            .insert(validator_id, ProducerAddress::new(address));
        self
    }

    pub fn with_estimate(mut self, range: BlockRange) -> Self {
        self.estimate = Some(range);
        self
    }

    pub fn rejecting_submissions(mut self) -> Self {
        self.reject_submission = true;
        self
    }

    pub fn publishing_on_submit(mut self, source: MockSpanSource, spans: Vec<SpanPayload>) -> Self {
        self.publish_on_submit = Some((source, spans));
        self
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl ValidatorAdmin for MockValidatorAdmin {
    async fn producer_address(
        &self,
        validator_id: ValidatorId,
    ) -> Result<ProducerAddress, AdminError> {
        self.addresses
            .get(&validator_id)
            .cloned()
            .ok_or(AdminError::InvalidKeyFile {
                validator_id,
                reason: "no such validator".to_string(),
            })
    }

    async fn estimate_downtime(
        &self,
        _validator_id: ValidatorId,
        _request: &DowntimeRequest,
        _producer: &ProducerAddress,
    ) -> Result<BlockRange, EstimationError> {
        self.estimate.ok_or(EstimationError::MissingField {
            field: "Calculated start block",
            output: String::new(),
        })
    }

    async fn submit_downtime(
        &self,
        validator_id: ValidatorId,
        request: &DowntimeRequest,
        producer: &ProducerAddress,
    ) -> Result<(), SubmissionError> {
        if self.reject_submission {
            return Err(SubmissionError::Rejected {
                validator_id,
                source: AdminError::CommandFailed {
                    validator_id,
                    status: ExitStatusText(Some(1)),
                    output: "mock rejection".to_string(),
                },
            });
        }

        self.submissions.lock().push(RecordedSubmission {
            validator_id,
            request: *request,
            producer: producer.clone(),
        });

        if let Some((source, spans)) = &self.publish_on_submit {
            for span in spans {
                source.publish(span.clone());
            }
        }
        Ok(())
    }
}

/// Clock frozen at a fixed instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
