use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crmsync_common::error::{CrmSyncError, CrmSyncResult};
use crmsync_config::{get_var_or, parse_var_or};
use crmsync_db::accounts::models::Account;
use crmsync_db::accounts::repositories::AccountRepository;
use crmsync_db::events::models::CrmEvent;
use crmsync_db::events::repositories::EventSink;

use super::associations::AssociationResolver;
use super::client::HubSpotClient;
use super::error::SyncError;
use super::fetcher::{PageHandler, PaginatedFetcher};
use super::models::CrmObject;
use super::normalize::RecordNormalizer;
use super::objects::{parse_object_types, ObjectType};
use super::retry::RetryPolicy;
use super::token::AccountContext;
use crate::batcher::{EventBatcher, DEFAULT_FLUSH_THRESHOLD};
use crate::connector::{Connector, SyncResult};

const SOURCE: &str = "hubspot";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub object_types: Vec<ObjectType>,
    pub batch_threshold: usize,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            object_types: ObjectType::DEFAULT_ORDER.to_vec(),
            batch_threshold: DEFAULT_FLUSH_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Reads `HUBSPOT_OBJECT_TYPES`, `EVENT_BATCH_THRESHOLD`,
    /// `HUBSPOT_MAX_RETRIES` and `HUBSPOT_RETRY_BASE_MS`; unset variables keep
    /// their defaults, malformed ones are an error.
    pub fn from_env() -> CrmSyncResult<Self> {
        let defaults = Self::default();

        let object_types = parse_object_types(&get_var_or(
            "HUBSPOT_OBJECT_TYPES",
            "contacts,companies,meetings",
        ))
        .map_err(|e| CrmSyncError::Config(format!("invalid HUBSPOT_OBJECT_TYPES: {e}")))?;

        let batch_threshold = parse_var_or("EVENT_BATCH_THRESHOLD", defaults.batch_threshold)?;
        let max_retries = parse_var_or("HUBSPOT_MAX_RETRIES", defaults.retry.max_retries)?;
        let base_delay_ms = parse_var_or(
            "HUBSPOT_RETRY_BASE_MS",
            defaults.retry.base_delay.as_millis() as u64,
        )?;

        Ok(Self {
            object_types,
            batch_threshold,
            retry: RetryPolicy {
                max_retries,
                base_delay: Duration::from_millis(base_delay_ms),
            },
        })
    }
}

/// Turns each page of one object type into events and queues them.
struct ObjectPageHandler<'h, 's, E> {
    object: ObjectType,
    normalizer: RecordNormalizer,
    resolver: &'h AssociationResolver<'h>,
    batcher: &'h mut EventBatcher<'s, E>,
    queued: usize,
}

impl<E: EventSink> ObjectPageHandler<'_, '_, E> {
    async fn push(&mut self, events: Vec<CrmEvent>) -> Result<(), SyncError> {
        for event in events {
            self.batcher.enqueue(event).await?;
            self.queued += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl<E: EventSink> PageHandler for ObjectPageHandler<'_, '_, E> {
    async fn handle_page(
        &mut self,
        ctx: &mut AccountContext,
        records: Vec<CrmObject>,
    ) -> Result<(), SyncError> {
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        let events: Vec<CrmEvent> = match self.object {
            ObjectType::Companies => records
                .iter()
                .filter_map(|r| self.normalizer.company(r))
                .collect(),
            ObjectType::Contacts => {
                let companies = self
                    .resolver
                    .resolve(ctx, ObjectType::Contacts, ObjectType::Companies, &ids)
                    .await;
                records
                    .iter()
                    .filter_map(|r| {
                        self.normalizer
                            .contact(r, companies.get(&r.id).map(String::as_str))
                    })
                    .collect()
            }
            ObjectType::Meetings => {
                let contacts = self
                    .resolver
                    .resolve(ctx, ObjectType::Meetings, ObjectType::Contacts, &ids)
                    .await;
                let contact_ids: Vec<String> = contacts.values().cloned().collect();
                let emails = self.resolver.resolve_contact_emails(ctx, &contact_ids).await;
                records
                    .iter()
                    .filter_map(|r| {
                        let email = contacts
                            .get(&r.id)
                            .and_then(|contact_id| emails.get(contact_id))
                            .map(String::as_str);
                        self.normalizer.meeting(r, email)
                    })
                    .collect()
            }
        };

        self.push(events).await
    }
}

#[derive(Debug, Default)]
struct AccountOutcome {
    events: usize,
    errors: usize,
}

pub struct HubSpotSyncer<A, E> {
    client: HubSpotClient,
    accounts: A,
    sink: E,
    config: SyncConfig,
}

impl<A, E> HubSpotSyncer<A, E>
where
    A: AccountRepository,
    E: EventSink,
{
    pub fn new(client: HubSpotClient, accounts: A, sink: E, config: SyncConfig) -> Self {
        Self {
            client,
            accounts,
            sink,
            config,
        }
    }

    async fn checkpoint(&self, account: &Account, stage: &str) {
        if let Err(e) = self.accounts.save_account(account).await {
            tracing::error!(
                hub_id = %account.hub_id,
                operation = "save_account",
                stage,
                error = %e,
                "failed to save account checkpoint"
            );
        }
    }

    async fn sync_account(&self, account: Account) -> AccountOutcome {
        let mut outcome = AccountOutcome::default();
        let mut ctx = AccountContext::new(account);
        let fetcher = PaginatedFetcher::new(&self.client, self.config.retry.clone());
        let resolver = AssociationResolver::new(&self.client);
        let mut batcher = EventBatcher::new(&self.sink, self.config.batch_threshold);

        tracing::info!(hub_id = %ctx.hub_id(), "starting account sync");

        if let Err(e) = ctx.refresh_token(&self.client).await {
            tracing::error!(
                hub_id = %ctx.hub_id(),
                operation = "refresh_access_token",
                error = %e,
                "token refresh failed, continuing with stored token"
            );
        }

        for &object in &self.config.object_types {
            let now = Utc::now();
            let mut handler = ObjectPageHandler {
                object,
                normalizer: RecordNormalizer::new(
                    ctx.hub_id(),
                    ctx.account.last_pulled(object.api_name()),
                ),
                resolver: &resolver,
                batcher: &mut batcher,
                queued: 0,
            };

            match fetcher.fetch(&mut ctx, object, now, &mut handler).await {
                Ok(summary) => {
                    tracing::info!(
                        hub_id = %ctx.hub_id(),
                        object = %object,
                        pages = summary.pages,
                        records = summary.records,
                        rollovers = summary.rollovers,
                        events = handler.queued,
                        "object pass completed"
                    );
                    // Events reach the sink before the watermark moves past them.
                    match batcher.drain().await {
                        Ok(_) => {
                            ctx.account.set_last_pulled(object.api_name(), now);
                            self.checkpoint(&ctx.account, object.api_name()).await;
                        }
                        Err(e) => {
                            tracing::error!(
                                hub_id = %ctx.hub_id(),
                                operation = %format!("drain_{object}"),
                                pending = batcher.pending(),
                                error = %e,
                                "failed to flush pass events, watermark not advanced"
                            );
                            outcome.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        hub_id = %ctx.hub_id(),
                        operation = %format!("process_{object}"),
                        error = %e,
                        "object pass failed"
                    );
                    outcome.errors += 1;
                }
            }
        }

        if let Err(e) = batcher.drain().await {
            tracing::error!(
                hub_id = %ctx.hub_id(),
                operation = "drain_events",
                pending = batcher.pending(),
                error = %e,
                "failed to flush remaining events"
            );
            outcome.errors += 1;
        }

        self.checkpoint(&ctx.account, "final").await;

        outcome.events = batcher.flushed_events();
        tracing::info!(
            hub_id = %ctx.hub_id(),
            events = outcome.events,
            flushes = batcher.flushes(),
            errors = outcome.errors,
            "account sync finished"
        );
        outcome
    }
}

#[async_trait]
impl<A, E> Connector for HubSpotSyncer<A, E>
where
    A: AccountRepository,
    E: EventSink,
{
    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn sync(&self) -> Result<SyncResult, Box<dyn std::error::Error + Send + Sync>> {
        let accounts = self
            .accounts
            .list_accounts()
            .await
            .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

        tracing::info!(count = accounts.len(), "loaded hubspot accounts");

        let mut result = SyncResult {
            source: SOURCE.to_string(),
            ..SyncResult::default()
        };

        for account in accounts {
            let outcome = self.sync_account(account).await;
            result.accounts += 1;
            result.events += outcome.events;
            result.errors += outcome.errors;
        }

        tracing::info!(?result, "hubspot sync completed");
        Ok(result)
    }
}
