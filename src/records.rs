//! Client-side helpers over untyped platform records.

use crate::rest::types::{CHECK_MODE_CREATED_UUID, CHECK_MODE_TASK_TAG, Query, Record};
use serde_json::Value;

/// Whether `record` holds every key of `query` with an equal value.
///
pub fn is_superset(record: &Record, query: &Query) -> bool {
    query
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

/// Keeps the records matching `query`, in their original order.
///
/// A missing or empty query matches everything.
///
pub fn filter_results(records: &[Record], query: Option<&Query>) -> Vec<Record> {
    match query {
        Some(query) if !query.is_empty() => records
            .iter()
            .filter(|record| is_superset(record, query))
            .cloned()
            .collect(),
        _ => records.to_vec(),
    }
}

/// Translates caller parameter names into platform field names.
///
/// # Arguments
///
/// * `params`: Parameters as the caller knows them, e.g. `vm_name`.
/// * `field_map`: Pairs of `(parameter, platform field)`, e.g.
///   `("vm_name", "name")`.
///
/// Parameters that are absent or `null` are left out of the query.
///
pub fn build_query(params: &Record, field_map: &[(&str, &str)]) -> Query {
    field_map
        .iter()
        .filter_map(|(param, field)| match params.get(*param) {
            None | Some(Value::Null) => None,
            Some(value) => Some(((*field).to_owned(), value.clone())),
        })
        .collect()
}

/// Projects `record` onto `keys`, skipping keys it does not have.
///
pub fn filter_dict(record: &Record, keys: &[&str]) -> Record {
    keys.iter()
        .filter_map(|key| record.get(*key).map(|value| ((*key).to_owned(), value.clone())))
        .collect()
}

pub fn is_changed(before: Option<&Record>, after: Option<&Record>) -> bool {
    before != after
}

/// Recognizes the record a create/update returns in check mode.
///
pub fn is_check_mode_placeholder(record: &Record) -> bool {
    record.get("createdUUID").and_then(Value::as_str) == Some(CHECK_MODE_CREATED_UUID)
        && record.get("taskTag").and_then(Value::as_str) == Some(CHECK_MODE_TASK_TAG)
}

pub(crate) fn describe_query(query: Option<&Query>) -> String {
    Value::Object(query.cloned().unwrap_or_default()).to_string()
}
