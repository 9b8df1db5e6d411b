//! Domain layer: spans, windows, checkpoints and retry policy.
//!
//! Pure logic. Nothing in here performs I/O; the only async item is
//! [`RetryPolicy::pause`].

pub mod address;
pub mod checkpoint;
pub mod phase;
pub mod retry;
pub mod span;
pub mod window;

pub use address::{BlockHeight, ProducerAddress, ValidatorId};
pub use checkpoint::{Checkpoint, CheckpointRecord};
pub use phase::Phase;
pub use retry::RetryPolicy;
pub use span::{SelectedProducer, Span, SpanPayload, SpanResponse, SpanSet};
pub use window::{BlockRange, DowntimeLookup, DowntimeRequest};
