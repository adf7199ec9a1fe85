use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::events::models::CrmEvent;
use crate::events::repositories::EventSink;
use crmsync_common::error::{CrmSyncError, CrmSyncResult};

/// Rows per insert statement; 9 binds each keeps us far below the
/// 65535 parameter limit.
const INSERT_CHUNK: usize = 1000;

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSink for PgEventRepository {
    async fn append(&self, events: Vec<CrmEvent>) -> CrmSyncResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CrmSyncError::Database(e.to_string()))?;

        let now = Utc::now();
        for chunk in events.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "insert into crm_events
                 (id, hub_id, object_type, action_name, action_date, identity,
                  include_in_analytics, properties, created_at) ",
            );
            qb.push_values(chunk, |mut b, event| {
                b.push_bind(Uuid::new_v4())
                    .push_bind(&event.hub_id)
                    .push_bind(&event.object_type)
                    .push_bind(&event.action_name)
                    .push_bind(event.action_date)
                    .push_bind(&event.identity)
                    .push_bind(event.include_in_analytics)
                    .push_bind(Json(&event.properties))
                    .push_bind(now);
            });

            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| CrmSyncError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| CrmSyncError::Database(e.to_string()))?;

        tracing::debug!(count = events.len(), "appended crm events");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use sqlx::Row;

    async fn test_repo() -> Option<(PgEventRepository, PgPool)> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url).await.expect("db should connect");

        sqlx::query(
            "create table if not exists crm_events (
               id uuid primary key,
               hub_id text not null,
               object_type text not null,
               action_name text not null,
               action_date timestamptz not null,
               identity text,
               include_in_analytics boolean not null default false,
               properties jsonb not null default '{}'::jsonb,
               created_at timestamptz not null default now()
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        Some((PgEventRepository::new(pool.clone()), pool))
    }

    fn event(hub_id: &str, n: usize) -> CrmEvent {
        let mut properties = serde_json::Map::new();
        properties.insert("contact_score".to_string(), serde_json::json!(n));
        CrmEvent {
            hub_id: hub_id.to_string(),
            object_type: "contacts".to_string(),
            action_name: "Contact Updated".to_string(),
            action_date: Utc::now(),
            identity: Some(format!("user{n}@example.com")),
            include_in_analytics: false,
            properties,
        }
    }

    #[tokio::test]
    async fn append_inserts_every_event_across_chunks() {
        let (repo, pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let hub_id = format!("test-{}", Uuid::new_v4());
        let events: Vec<CrmEvent> = (0..INSERT_CHUNK + 5).map(|n| event(&hub_id, n)).collect();

        repo.append(events).await.expect("append");

        let row = sqlx::query("select count(*) as n from crm_events where hub_id = $1")
            .bind(&hub_id)
            .fetch_one(&pool)
            .await
            .expect("count");
        let n: i64 = row.get("n");
        assert_eq!(n as usize, INSERT_CHUNK + 5);
    }

    #[tokio::test]
    async fn append_empty_is_noop() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        repo.append(Vec::new()).await.expect("empty append");
    }
}
