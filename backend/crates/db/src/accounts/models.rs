use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A connected HubSpot portal with its OAuth credentials and per-object
/// sync watermarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub hub_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Keyed by object type name (`contacts`, `companies`, `meetings`, ...).
    #[serde(default)]
    pub last_pulled_dates: BTreeMap<String, DateTime<Utc>>,
}

impl Account {
    pub fn new(hub_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            last_pulled_dates: BTreeMap::new(),
        }
    }

    pub fn last_pulled(&self, object_type: &str) -> Option<DateTime<Utc>> {
        self.last_pulled_dates.get(object_type).copied()
    }

    pub fn set_last_pulled(&mut self, object_type: &str, at: DateTime<Utc>) {
        self.last_pulled_dates.insert(object_type.to_owned(), at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_account_has_no_watermarks() {
        let account = Account::new("123", "refresh");
        assert!(account.access_token.is_empty());
        assert!(account.last_pulled("contacts").is_none());
    }

    #[test]
    fn set_last_pulled_overwrites() {
        let mut account = Account::new("123", "refresh");
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        account.set_last_pulled("contacts", first);
        account.set_last_pulled("contacts", second);

        assert_eq!(account.last_pulled("contacts"), Some(second));
        assert!(account.last_pulled("companies").is_none());
    }

    #[test]
    fn deserializes_without_watermarks() {
        let json = r#"{"hub_id": "42", "access_token": "", "refresh_token": "r"}"#;
        let account: Account = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(account.hub_id, "42");
        assert!(account.last_pulled_dates.is_empty());
    }
}
