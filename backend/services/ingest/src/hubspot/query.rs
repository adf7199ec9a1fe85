use chrono::{DateTime, Utc};

use super::models::{Filter, FilterGroup, FilterOperator, SearchRequest, Sort, SortDirection};
use super::objects::ObjectType;

/// Build a search request for one page of an incremental pass.
///
/// With an `edge`, the request is bounded to `edge <= modified <= now`
/// (epoch milliseconds). Results are always sorted ascending by the object's
/// modification property so a rollover edge taken from the last record of a
/// page is a valid restart point.
pub fn build_search_request(
    object: ObjectType,
    edge: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    after: Option<&str>,
    limit: u32,
) -> SearchRequest {
    let property = object.modified_property();

    SearchRequest {
        filter_groups: edge
            .map(|from| vec![modified_window(property, from, now)])
            .unwrap_or_default(),
        sorts: vec![Sort {
            property_name: property.to_string(),
            direction: SortDirection::Ascending,
        }],
        properties: object.properties().iter().map(|p| p.to_string()).collect(),
        limit,
        after: after.map(str::to_string),
    }
}

fn modified_window(property: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> FilterGroup {
    FilterGroup {
        filters: vec![
            Filter {
                property_name: property.to_string(),
                operator: FilterOperator::Gte,
                value: from.timestamp_millis().to_string(),
            },
            Filter {
                property_name: property.to_string(),
                operator: FilterOperator::Lte,
                value: to.timestamp_millis().to_string(),
            },
        ],
    }
}
