use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmSyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CrmSyncResult<T> = Result<T, CrmSyncError>;
