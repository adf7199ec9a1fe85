use crmsync_common::error::CrmSyncResult;
use crmsync_db::events::models::CrmEvent;
use crmsync_db::events::repositories::EventSink;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 2000;

/// Buffers events in front of an [`EventSink`].
///
/// The live batch is swapped out before the sink is called, so events
/// enqueued after a flush starts land in the next batch. If the sink fails
/// the taken events are put back in front of the buffer and the error is
/// returned, so a later flush delivers them.
pub struct EventBatcher<'a, S: ?Sized> {
    sink: &'a S,
    threshold: usize,
    batch: Vec<CrmEvent>,
    flushed_events: usize,
    flushes: usize,
}

impl<'a, S> EventBatcher<'a, S>
where
    S: EventSink + ?Sized,
{
    pub fn new(sink: &'a S, threshold: usize) -> Self {
        Self {
            sink,
            threshold: threshold.max(1),
            batch: Vec::new(),
            flushed_events: 0,
            flushes: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn flushed_events(&self) -> usize {
        self.flushed_events
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Append an event; flushes once the batch grows past the threshold.
    pub async fn enqueue(&mut self, event: CrmEvent) -> CrmSyncResult<()> {
        self.batch.push(event);

        if self.batch.len() > self.threshold {
            tracing::info!(count = self.batch.len(), "inserting events");
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush whatever is buffered, regardless of size. Returns the number of
    /// events handed to the sink.
    pub async fn drain(&mut self) -> CrmSyncResult<usize> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = self.batch.len(), "draining remaining events");
        self.flush().await
    }

    async fn flush(&mut self) -> CrmSyncResult<usize> {
        let snapshot = std::mem::take(&mut self.batch);
        let count = snapshot.len();

        if let Err(e) = self.sink.append(snapshot.clone()).await {
            let mut restored = snapshot;
            restored.append(&mut self.batch);
            self.batch = restored;
            return Err(e);
        }

        self.flushes += 1;
        self.flushed_events += count;
        Ok(count)
    }
}
