//! Wire representation of donor task responses.
//!
//! The donor service is loose about shapes: identifiers and status codes
//! arrive as strings or numbers, the title may be called `description`, and
//! list responses may or may not be wrapped in an envelope. Unknown fields
//! are ignored. Only the identifier is required: an optional field of an
//! unexpected type is read as text when it is a scalar and dropped
//! otherwise, so one odd task never rejects the whole list.

use crate::donor_task::{
    domain::{DonorContact, DonorTaskId, RemoteTaskRecord},
    ports::{DonorGatewayError, DonorGatewayResult},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Envelope fields that may wrap a task list, in lookup order.
const LIST_ENVELOPE_FIELDS: [&str; 3] = ["items", "tasks", "data"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Number(serde_json::Number),
}

impl ScalarText {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    id: ScalarText,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    updated_at: Option<Value>,
    #[serde(default)]
    task_date: Option<Value>,
    #[serde(default)]
    notes: Option<Value>,
    #[serde(default)]
    is_thank: Option<Value>,
    #[serde(default)]
    contacts: Option<Value>,
}

impl TaskPayload {
    fn into_record(self) -> Result<RemoteTaskRecord, String> {
        let id = DonorTaskId::new(self.id.into_text());
        if id.as_str().is_empty() {
            return Err("empty task id".to_owned());
        }
        let title = self
            .title
            .as_ref()
            .and_then(lenient_text)
            .or_else(|| self.description.as_ref().and_then(lenient_text))
            .unwrap_or_default();
        let status = self
            .status
            .as_ref()
            .and_then(lenient_text)
            .unwrap_or_default();

        let mut record = RemoteTaskRecord::new(id, title, status)
            .with_timestamps(
                self.created_at.as_ref().and_then(lenient_timestamp),
                self.updated_at.as_ref().and_then(lenient_timestamp),
            )
            .with_thank(self.is_thank.as_ref().is_some_and(truthy))
            .with_contacts(self.contacts.as_ref().map(contacts).unwrap_or_default());
        if let Some(task_date) = self.task_date.as_ref().and_then(lenient_text) {
            record = record.with_task_date(task_date);
        }
        if let Some(notes) = self.notes.as_ref().and_then(lenient_text) {
            record = record.with_notes(notes);
        }
        Ok(record)
    }
}

/// Reads an optional text field. Scalars become text; nulls, arrays and
/// objects are treated as absent.
fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads the contact list, skipping entries without a usable identifier.
fn contacts(value: &Value) -> Vec<DonorContact> {
    value.as_array().map_or_else(Vec::new, |entries| {
        entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("id").and_then(lenient_text)?;
                let file_as = entry.get("file_as").and_then(lenient_text);
                Some(DonorContact::new(id, file_as))
            })
            .collect()
    })
}

/// Accepts RFC 3339, or an ISO 8601 timestamp without offset read as UTC.
fn lenient_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn malformed(detail: impl Into<String>) -> DonorGatewayError {
    DonorGatewayError::MalformedResponse(detail.into())
}

/// Decodes a task list body.
///
/// # Errors
///
/// Returns [`DonorGatewayError::MalformedResponse`] when the body is not
/// JSON, carries no task array, or holds an element that is not a task.
pub(crate) fn parse_task_list(body: &[u8]) -> DonorGatewayResult<Vec<RemoteTaskRecord>> {
    let document: Value =
        serde_json::from_slice(body).map_err(|err| malformed(format!("invalid JSON: {err}")))?;
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut fields) => LIST_ENVELOPE_FIELDS
            .iter()
            .find_map(|name| match fields.remove(*name) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| malformed("expected a task array or an items/tasks/data envelope"))?,
        _ => return Err(malformed("expected a task array")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<TaskPayload>(item)
                .map_err(|err| err.to_string())
                .and_then(TaskPayload::into_record)
                .map_err(|detail| malformed(format!("task at index {index}: {detail}")))
        })
        .collect()
}

/// Decodes a single task body.
///
/// # Errors
///
/// Returns [`DonorGatewayError::MalformedResponse`] when the body is not a
/// task object.
pub(crate) fn parse_task(body: &[u8]) -> DonorGatewayResult<RemoteTaskRecord> {
    serde_json::from_slice::<TaskPayload>(body)
        .map_err(|err| err.to_string())
        .and_then(TaskPayload::into_record)
        .map_err(|detail| malformed(format!("task: {detail}")))
}
