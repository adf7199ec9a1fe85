use async_trait::async_trait;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncResult {
    pub source: String,
    pub accounts: usize,
    pub events: usize,
    pub errors: usize,
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn source_name(&self) -> &str;
    async fn sync(&self) -> Result<SyncResult, Box<dyn std::error::Error + Send + Sync>>;
}
