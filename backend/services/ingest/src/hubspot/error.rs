use crmsync_common::error::CrmSyncError;

use super::client::HubSpotClientError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to fetch {object} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        object: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("access token refresh failed: {0}")]
    AuthRefresh(#[source] HubSpotClientError),

    #[error("event sink failed: {0}")]
    Sink(#[from] CrmSyncError),
}
