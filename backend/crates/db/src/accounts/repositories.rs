use async_trait::async_trait;

use crate::accounts::models::Account;
use crmsync_common::error::CrmSyncResult;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// All connected accounts, ordered by hub id.
    async fn list_accounts(&self) -> CrmSyncResult<Vec<Account>>;

    /// Persist credentials and watermarks. Idempotent: keyed by `hub_id`.
    async fn save_account(&self, account: &Account) -> CrmSyncResult<()>;
}
