use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized CRM activity ready for the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmEvent {
    pub hub_id: String,
    pub object_type: String,
    /// `"<Entity> Created"` or `"<Entity> Updated"`.
    pub action_name: String,
    pub action_date: DateTime<Utc>,
    pub identity: Option<String>,
    pub include_in_analytics: bool,
    pub properties: Map<String, Value>,
}
