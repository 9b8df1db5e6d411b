//! Span registry: the locally cached rotation schedule.

use crate::domain::{BlockHeight, Span, SpanSet};
use crate::error::FetchError;
use crate::ports::SpanSource;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owned cache of the spans published by the authority registry.
///
/// [`SpanRegistry::refresh`] rebuilds the whole set and swaps it in; a
/// snapshot taken earlier keeps its view.
pub struct SpanRegistry {
    source: Arc<dyn SpanSource>,
    spans: SpanSet,
}

impl SpanRegistry {
    pub fn new(source: Arc<dyn SpanSource>) -> Self {
        Self {
            source,
            spans: SpanSet::default(),
        }
    }

    /// Refetch spans `0, 1, 2, ...` until the registry stops answering.
    ///
    /// Index 0 must succeed. Any later transport, status or decode failure
    /// ends the iteration; an unreadable body, malformed numbers or bounds
    /// fail the refresh.
    pub async fn refresh(&mut self) -> Result<(), FetchError> {
        let mut spans = Vec::new();
        let mut skipped = 0usize;
        let mut index = 0u64;

        loop {
            let payload = match self.source.fetch_span(index).await {
                Ok(payload) => payload,
                Err(e) if index > 0 && e.ends_iteration() => {
                    debug!(index, error = %e, "span iteration ended");
                    break;
                }
                Err(e) => return Err(e),
            };

            match Span::from_payload(index, &payload)? {
                Some(span) => spans.push(span),
                None => {
                    debug!(
                        index,
                        producers = payload.selected_producers.len(),
                        "skipping span without a single producer"
                    );
                    skipped += 1;
                }
            }
            index += 1;
        }

        let spans = SpanSet::new(spans);
        if spans.is_empty() {
            warn!(fetched = index, skipped, "no published span names a single producer");
        } else {
            info!(
                fetched = index,
                kept = spans.len(),
                skipped,
                "span registry refreshed"
            );
        }
        self.spans = spans;
        Ok(())
    }

    /// Span covering `height`, most recently fetched first.
    pub fn resolve_expected_producer(&self, height: BlockHeight) -> Option<&Span> {
        self.spans.resolve_expected_producer(height)
    }

    /// Current span set; cheap to clone and unaffected by later refreshes.
    pub fn snapshot(&self) -> SpanSet {
        self.spans.clone()
    }
}
