use async_trait::async_trait;

use crate::events::models::CrmEvent;
use crmsync_common::error::CrmSyncResult;

/// Destination for flushed event batches. Append-only; callers do not
/// expect deduplication.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, events: Vec<CrmEvent>) -> CrmSyncResult<()>;
}
