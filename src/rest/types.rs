use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One resource instance as returned by the platform.
///
/// The REST layer never interprets field names; typed views belong to the
/// per-resource modules.
///
pub type Record = Map<String, Value>;

/// Field-to-value mapping used for client-side filtering (logical AND, exact
/// equality per key).
///
pub type Query = Map<String, Value>;

/// `createdUUID` returned by mutating calls in check mode.
pub const CHECK_MODE_CREATED_UUID: &str = "0000000000";

/// `taskTag` returned by mutating calls in check mode.
pub const CHECK_MODE_TASK_TAG: &str = "00000";

/// Generic wrapper of platform API responses.
///
/// # Example JSON
///
/// ```json
/// {
///     "result": [ ... ]
/// }
/// ```
///
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// Builds the record every create/update call returns in check mode.
///
pub fn check_mode_placeholder() -> Record {
    let mut record = Record::new();
    record.insert("createdUUID".to_owned(), CHECK_MODE_CREATED_UUID.into());
    record.insert("taskTag".to_owned(), CHECK_MODE_TASK_TAG.into());
    record
}

/// What `get_record` does when more than one record matches the query.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Return the first match in the order the platform listed them.
    First,
    /// Fail with `Error::Ambiguous`.
    #[default]
    Fail,
}

// -----------------------------------------------------------------------------

/// Handle of an asynchronous platform operation.
///
/// New-type wrapper so a plain string can't be passed where a task tag is
/// expected.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTag(String);

impl TaskTag {
    /// Extracts the `taskTag` field of a create/update/delete result.
    ///
    /// Returns `None` when the field is missing, empty or not a scalar.
    ///
    pub fn from_record(record: &Record) -> Option<Self> {
        let tag = match record.get("taskTag")? {
            Value::String(tag) => tag.trim().to_owned(),
            Value::Number(tag) => tag.to_string(),
            _ => return None,
        };
        (!tag.is_empty()).then_some(Self(tag))
    }

    /// Percent-encode the tag to make it safe for use in a URL path.
    ///
    pub fn encoded(&self) -> String {
        utf8_percent_encode(&self.0, NON_ALPHANUMERIC).to_string()
    }

    /// Whether this is the tag fabricated by a check-mode call.
    ///
    pub fn is_placeholder(&self) -> bool {
        self.0 == CHECK_MODE_TASK_TAG
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for TaskTag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for TaskTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// High-level status of an asynchronous platform task.
///
#[derive(Debug, PartialEq)]
pub enum TaskStatus {
    /// Any non-terminal state, e.g. `RUNNING` or `QUEUED`.
    Pending(String),
    Completed,
    /// Holds the full task record serialized as JSON.
    Failed(String),
}

impl TaskStatus {
    /// Classifies a task record by its `state` field.
    ///
    pub fn from_record(record: &Record) -> Self {
        match record.get("state").and_then(Value::as_str).unwrap_or_default() {
            "COMPLETE" => Self::Completed,
            "ERROR" => Self::Failed(Value::Object(record.clone()).to_string()),
            state => Self::Pending(state.to_owned()),
        }
    }
}
