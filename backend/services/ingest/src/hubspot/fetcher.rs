use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::client::HubSpotClient;
use super::error::SyncError;
use super::models::{CrmObject, SearchRequest, SearchResponse};
use super::objects::ObjectType;
use super::query::build_search_request;
use super::retry::RetryPolicy;
use super::token::AccountContext;

/// Offset-addressable records a single search cursor can reach.
pub const RESULT_WINDOW: u64 = 10_000;

pub const PAGE_LIMIT: u32 = 100;

/// Receives each page of a pass, in order.
#[async_trait]
pub trait PageHandler: Send {
    async fn handle_page(
        &mut self,
        ctx: &mut AccountContext,
        records: Vec<CrmObject>,
    ) -> Result<(), SyncError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pages: usize,
    pub records: usize,
    pub rollovers: usize,
}

/// Position inside one pass: the provider cursor plus the modification time
/// the current cursor sequence started from after a rollover.
#[derive(Debug, Default, Clone, PartialEq)]
struct PageCursor {
    after: Option<String>,
    edge: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq)]
enum Advance {
    Next,
    RolledOver,
    Done,
}

impl PageCursor {
    /// Move past a page. Once the next offset would leave the result window,
    /// restart from the last record's modification time instead; records
    /// sharing that timestamp may be delivered again.
    fn advance(
        &mut self,
        next_after: Option<&str>,
        last_modified: Option<DateTime<Utc>>,
        current_edge: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Advance {
        let Some(next_after) = next_after else {
            return Advance::Done;
        };

        let beyond_window = next_after
            .parse::<u64>()
            .map(|offset| offset + u64::from(limit) >= RESULT_WINDOW)
            .unwrap_or(false);

        if !beyond_window {
            self.after = Some(next_after.to_string());
            return Advance::Next;
        }

        let Some(last_modified) = last_modified else {
            // Nothing to restart from; an empty page cannot make progress.
            return Advance::Done;
        };

        let edge = match current_edge {
            Some(current) if last_modified <= current => {
                tracing::warn!(
                    stalled_at = %current,
                    "result window filled by a single timestamp, skipping ahead 1ms"
                );
                current + Duration::milliseconds(1)
            }
            _ => last_modified,
        };

        self.after = None;
        self.edge = Some(edge);
        Advance::RolledOver
    }
}

/// Runs incremental search passes with retry and mid-flight token refresh.
pub struct PaginatedFetcher<'a> {
    client: &'a HubSpotClient,
    retry: RetryPolicy,
    page_limit: u32,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(client: &'a HubSpotClient, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            page_limit: PAGE_LIMIT,
        }
    }

    /// Pull every record of `object` modified since the account's watermark
    /// and up to `now`, handing each page to `handler`. The watermark itself
    /// is left untouched.
    pub async fn fetch<H: PageHandler>(
        &self,
        ctx: &mut AccountContext,
        object: ObjectType,
        now: DateTime<Utc>,
        handler: &mut H,
    ) -> Result<PassSummary, SyncError> {
        let watermark = ctx
            .account
            .last_pulled(object.api_name())
            .filter(|_| object.supports_modified_filter());
        let mut cursor = PageCursor::default();
        let mut summary = PassSummary::default();

        loop {
            let edge = cursor.edge.or(watermark);
            let request =
                build_search_request(object, edge, now, cursor.after.as_deref(), self.page_limit);

            let page = self.search_with_retry(ctx, object, &request).await?;
            let next_after = page.next_after().map(str::to_string);
            let last_modified = page.results.last().map(|r| r.updated_at);

            summary.pages += 1;
            summary.records += page.results.len();

            tracing::info!(
                hub_id = %ctx.hub_id(),
                object = %object,
                batch_size = page.results.len(),
                "fetched batch"
            );

            handler.handle_page(ctx, page.results).await?;

            match cursor.advance(next_after.as_deref(), last_modified, edge, self.page_limit) {
                Advance::Next => {}
                Advance::RolledOver => {
                    summary.rollovers += 1;
                    tracing::debug!(
                        hub_id = %ctx.hub_id(),
                        object = %object,
                        edge = ?cursor.edge,
                        "result window reached, restarting from last modified date"
                    );
                }
                Advance::Done => break,
            }
        }

        Ok(summary)
    }

    async fn search_with_retry(
        &self,
        ctx: &mut AccountContext,
        object: ObjectType,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SyncError> {
        let mut last_error = String::new();
        let mut unauthorized = false;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                if unauthorized || ctx.tokens.is_expired(Utc::now()) {
                    ctx.refresh_token(self.client).await?;
                }

                let delay = self.retry.backoff(attempt);
                tracing::warn!(
                    hub_id = %ctx.hub_id(),
                    object = %object,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "retrying search after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            match self
                .client
                .search(ctx.access_token(), object.api_name(), request)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) => {
                    unauthorized = e.is_unauthorized();
                    last_error = e.to_string();
                }
            }
        }

        Err(SyncError::FetchExhausted {
            object: object.api_name(),
            attempts: self.retry.max_attempts(),
            last_error,
        })
    }
}
