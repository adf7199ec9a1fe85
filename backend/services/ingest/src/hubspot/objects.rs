use std::fmt;
use std::str::FromStr;

/// CRM object collections the engine knows how to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Companies,
    Contacts,
    Meetings,
}

impl ObjectType {
    /// Default pass order for an account.
    pub const DEFAULT_ORDER: [ObjectType; 3] = [
        ObjectType::Contacts,
        ObjectType::Companies,
        ObjectType::Meetings,
    ];

    /// Path segment in the CRM API; also the watermark key on the account.
    pub fn api_name(self) -> &'static str {
        match self {
            ObjectType::Companies => "companies",
            ObjectType::Contacts => "contacts",
            ObjectType::Meetings => "meetings",
        }
    }

    /// Singular name used in event action names.
    pub fn entity_name(self) -> &'static str {
        match self {
            ObjectType::Companies => "Company",
            ObjectType::Contacts => "Contact",
            ObjectType::Meetings => "Meeting",
        }
    }

    /// Property holding the last modification time; used for sort and filter.
    pub fn modified_property(self) -> &'static str {
        match self {
            ObjectType::Contacts => "lastmodifieddate",
            ObjectType::Companies | ObjectType::Meetings => "hs_lastmodifieddate",
        }
    }

    /// Meetings search rejects the watermark window filter, so meeting passes
    /// start unfiltered.
    pub fn supports_modified_filter(self) -> bool {
        !matches!(self, ObjectType::Meetings)
    }

    pub fn properties(self) -> &'static [&'static str] {
        match self {
            ObjectType::Companies => &[
                "name",
                "domain",
                "country",
                "industry",
                "description",
                "annualrevenue",
                "numberofemployees",
                "hs_lead_status",
            ],
            ObjectType::Contacts => &[
                "firstname",
                "lastname",
                "jobtitle",
                "email",
                "hubspotscore",
                "hs_lead_status",
                "hs_analytics_source",
                "hs_latest_source",
            ],
            ObjectType::Meetings => &[
                "hs_meeting_title",
                "hs_createdate",
                "hs_lastmodifieddate",
                "hs_object_id",
            ],
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "companies" | "company" => Ok(ObjectType::Companies),
            "contacts" | "contact" => Ok(ObjectType::Contacts),
            "meetings" | "meeting" => Ok(ObjectType::Meetings),
            other => Err(format!("unknown object type: {other}")),
        }
    }
}

/// Parse a comma-separated list of object types, keeping the given order and
/// dropping duplicates. Fails on unknown names or an empty list.
pub fn parse_object_types(raw: &str) -> Result<Vec<ObjectType>, String> {
    let mut types = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let object = part.parse::<ObjectType>()?;
        if !types.contains(&object) {
            types.push(object);
        }
    }

    if types.is_empty() {
        return Err("no object types configured".to_string());
    }

    Ok(types)
}
