//! Chain poller over the execution-layer RPC.

use crate::domain::{BlockHeight, ProducerAddress, RetryPolicy};
use crate::error::RpcError;
use crate::ports::ChainReader;
use std::sync::Arc;
use tracing::{debug, trace};

/// Height and author queries plus the blocking "wait for height" loop.
#[derive(Clone)]
pub struct ChainPoller {
    reader: Arc<dyn ChainReader>,
}

impl ChainPoller {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    pub async fn current_height(&self) -> Result<BlockHeight, RpcError> {
        self.reader.latest_block_number().await
    }

    /// Recorded author of `height`.
    pub async fn author_of(&self, height: BlockHeight) -> Result<ProducerAddress, RpcError> {
        let author = self.reader.block_author(height).await?;
        if author.is_empty() {
            return Err(RpcError::EmptyAuthor { height });
        }
        Ok(author)
    }

    /// Poll until the chain height reaches `target`.
    ///
    /// Any RPC failure aborts the wait. Returns the height that satisfied the
    /// target, or [`RpcError::WaitExhausted`] if the policy is bounded and
    /// runs out.
    pub async fn wait_for_height(
        &self,
        target: BlockHeight,
        policy: &RetryPolicy,
    ) -> Result<BlockHeight, RpcError> {
        let mut attempt = 1u32;
        loop {
            let height = self.current_height().await?;
            if height >= target {
                debug!(target_height = target, height, attempt, "target height reached");
                return Ok(height);
            }

            trace!(target_height = target, height, attempt, "waiting for height");
            if !policy.allows(attempt + 1) {
                return Err(RpcError::WaitExhausted {
                    target,
                    last_seen: height,
                    attempts: attempt,
                });
            }
            attempt += 1;
            policy.pause().await;
        }
    }
}
