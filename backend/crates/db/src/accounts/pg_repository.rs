use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::accounts::models::Account;
use crate::accounts::repositories::AccountRepository;
use crmsync_common::error::{CrmSyncError, CrmSyncResult};

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> CrmSyncResult<Account> {
        let dates: Json<BTreeMap<String, DateTime<Utc>>> = row
            .try_get("last_pulled_dates")
            .map_err(|e| CrmSyncError::Internal(format!("bad last_pulled_dates: {e}")))?;

        Ok(Account {
            hub_id: row.get("hub_id"),
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            last_pulled_dates: dates.0,
        })
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn list_accounts(&self) -> CrmSyncResult<Vec<Account>> {
        let rows = sqlx::query(
            "select hub_id, access_token, refresh_token, last_pulled_dates
             from hubspot_accounts
             order by hub_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrmSyncError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn save_account(&self, account: &Account) -> CrmSyncResult<()> {
        sqlx::query(
            "insert into hubspot_accounts (hub_id, access_token, refresh_token, last_pulled_dates, updated_at)
             values ($1, $2, $3, $4, $5)
             on conflict (hub_id) do update set
               access_token = excluded.access_token,
               refresh_token = excluded.refresh_token,
               last_pulled_dates = excluded.last_pulled_dates,
               updated_at = excluded.updated_at",
        )
        .bind(&account.hub_id)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(Json(&account.last_pulled_dates))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| CrmSyncError::Database(e.to_string()))?;

        Ok(())
    }
}
