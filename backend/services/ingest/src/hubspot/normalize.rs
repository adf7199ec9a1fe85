use chrono::{DateTime, Duration, Utc};
use crmsync_db::events::models::CrmEvent;
use serde_json::{Map, Value};

use super::models::CrmObject;
use super::objects::ObjectType;

/// Placeholder values HubSpot portals commonly store instead of leaving a
/// property empty. Compared case-insensitively.
pub const DISALLOWED_VALUES: [&str; 8] = [
    "[not provided]",
    "placeholder",
    "[[unknown]]",
    "not set",
    "not provided",
    "unknown",
    "undefined",
    "n/a",
];

/// Marker left behind by unresolved personalization tokens.
const UNRESOLVED_TOKEN_MARKER: &str = "!$record";

/// Company events are backdated so they sort ahead of the contact activity
/// created in the same instant.
const COMPANY_ACTION_OFFSET_SECS: i64 = 2;

/// Drop null, empty and placeholder values. Everything else, including
/// whitespace and non-string values, is kept as-is.
pub fn filter_null_values(properties: Map<String, Value>) -> Map<String, Value> {
    properties
        .into_iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(s) => is_meaningful(s),
            _ => true,
        })
        .collect()
}

fn is_meaningful(value: &str) -> bool {
    let lowered = value.to_lowercase();
    !lowered.is_empty()
        && !DISALLOWED_VALUES.contains(&lowered.as_str())
        && !lowered.contains(UNRESOLVED_TOKEN_MARKER)
}

/// Maps raw records of one pass into events.
///
/// A record counts as created when there is no watermark yet or it was
/// created strictly after the watermark.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    hub_id: String,
    watermark: Option<DateTime<Utc>>,
}

impl RecordNormalizer {
    pub fn new(hub_id: impl Into<String>, watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            hub_id: hub_id.into(),
            watermark,
        }
    }

    pub fn is_created(&self, record: &CrmObject) -> bool {
        match self.watermark {
            Some(watermark) => record.created_at > watermark,
            None => true,
        }
    }

    pub fn company(&self, record: &CrmObject) -> Option<CrmEvent> {
        record.properties.as_ref()?;

        let mut props = Map::new();
        props.insert("company_id".into(), Value::String(record.id.clone()));
        insert_str(&mut props, "company_domain", record.property("domain"));
        insert_str(&mut props, "company_industry", record.property("industry"));

        let mut event = self.event(ObjectType::Companies, record, None, props);
        event.action_date -= Duration::seconds(COMPANY_ACTION_OFFSET_SECS);
        Some(event)
    }

    /// Contacts without an email have no identity and are skipped.
    pub fn contact(&self, record: &CrmObject, company_id: Option<&str>) -> Option<CrmEvent> {
        let email = record.property("email").filter(|e| !e.trim().is_empty())?;

        let name = format!(
            "{} {}",
            record.property("firstname").unwrap_or_default(),
            record.property("lastname").unwrap_or_default()
        );
        let score = record
            .property("hubspotscore")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(|s| s.trunc() as i64)
            .unwrap_or(0);

        let mut props = Map::new();
        insert_str(&mut props, "company_id", company_id);
        insert_str(&mut props, "contact_name", Some(name.trim()));
        insert_str(&mut props, "contact_title", record.property("jobtitle"));
        insert_str(&mut props, "contact_source", record.property("hs_analytics_source"));
        insert_str(&mut props, "contact_status", record.property("hs_lead_status"));
        props.insert("contact_score".into(), Value::from(score));

        Some(self.event(ObjectType::Contacts, record, Some(email.to_string()), props))
    }

    /// Meetings are kept even when no contact email could be resolved.
    pub fn meeting(&self, record: &CrmObject, contact_email: Option<&str>) -> Option<CrmEvent> {
        record.properties.as_ref()?;

        let mut props = Map::new();
        insert_str(&mut props, "contact_email", contact_email);
        insert_str(&mut props, "meeting_title", record.property("hs_meeting_title"));
        insert_str(&mut props, "meeting_start_time", record.property("hs_createdate"));
        insert_str(&mut props, "meeting_end_time", record.property("hs_lastmodifieddate"));
        insert_str(&mut props, "meeting_object_id", record.property("hs_object_id"));

        let identity = contact_email
            .filter(|e| is_meaningful(e))
            .map(str::to_string);
        Some(self.event(ObjectType::Meetings, record, identity, props))
    }

    fn event(
        &self,
        object: ObjectType,
        record: &CrmObject,
        identity: Option<String>,
        properties: Map<String, Value>,
    ) -> CrmEvent {
        let created = self.is_created(record);
        let (verb, action_date) = if created {
            ("Created", record.created_at)
        } else {
            ("Updated", record.updated_at)
        };

        CrmEvent {
            hub_id: self.hub_id.clone(),
            object_type: object.api_name().to_string(),
            action_name: format!("{} {verb}", object.entity_name()),
            action_date,
            identity,
            include_in_analytics: false,
            properties: filter_null_values(properties),
        }
    }
}

fn insert_str(props: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    props.insert(
        key.to_string(),
        value.map_or(Value::Null, |v| Value::String(v.to_string())),
    );
}
