use chrono::{DateTime, Duration, Utc};
use crmsync_db::accounts::models::Account;

use super::client::HubSpotClient;
use super::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenState {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// OAuth token lifecycle for one account during one sync run.
#[derive(Debug, Default)]
pub struct TokenManager {
    state: Option<TokenState>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_state(state: TokenState) -> Self {
        Self { state: Some(state) }
    }

    /// True until a refresh succeeded, and again once `now` passes the
    /// tracked expiration.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.state {
            Some(state) => now > state.expires_at,
            None => true,
        }
    }

    /// Exchange the account's refresh token for a new access token.
    ///
    /// Updates `account.access_token` (and a rotated refresh token) in place;
    /// persisting the account is the caller's job.
    pub async fn refresh(
        &mut self,
        client: &HubSpotClient,
        account: &mut Account,
    ) -> Result<TokenState, SyncError> {
        let response = client
            .refresh_access_token(&account.refresh_token)
            .await
            .map_err(SyncError::AuthRefresh)?;

        let expires_at = Utc::now() + Duration::seconds(response.expires_in);

        if response.access_token != account.access_token {
            account.access_token = response.access_token.clone();
        }
        if let Some(rotated) = response.refresh_token.filter(|r| *r != account.refresh_token) {
            tracing::info!(hub_id = %account.hub_id, "refresh token rotated");
            account.refresh_token = rotated;
        }

        tracing::info!(hub_id = %account.hub_id, %expires_at, "access token refreshed");

        let state = TokenState {
            access_token: response.access_token,
            expires_at,
        };
        self.state = Some(state.clone());
        Ok(state)
    }
}

/// Mutable per-account state threaded through one sync run.
#[derive(Debug)]
pub struct AccountContext {
    pub account: Account,
    pub tokens: TokenManager,
}

impl AccountContext {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            tokens: TokenManager::new(),
        }
    }

    pub fn hub_id(&self) -> &str {
        &self.account.hub_id
    }

    pub fn access_token(&self) -> &str {
        &self.account.access_token
    }

    pub async fn refresh_token(&mut self, client: &HubSpotClient) -> Result<TokenState, SyncError> {
        self.tokens.refresh(client, &mut self.account).await
    }
}
