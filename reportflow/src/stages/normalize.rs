//! Reply normalization for the stage adapters.
//!
//! The two deployment layouts disagree on reply shapes. Everything here maps
//! the observed variants onto one typed result.

use serde_json::{Map, Value};

use crate::core::{ColumnDescription, ExecutionResult, MetadataResult, Plan, ProfileResult, Task, UploadResult};
use crate::errors::{ReportflowError, Result};

/// Usage accounting some services attach to agent replies.
const USAGE_KEY: &str = "_usage";

/// Reads the stored path from an upload reply.
pub fn normalize_upload(url: &str, value: Value) -> Result<UploadResult> {
    match value.get("file_path").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => Ok(UploadResult {
            remote_file_path: path.to_string(),
        }),
        _ => Err(ReportflowError::decode(url, "upload reply has no file_path")),
    }
}

/// Reads a profile reply.
pub fn normalize_profile(url: &str, value: Value) -> Result<ProfileResult> {
    if !value.is_object() {
        return Err(ReportflowError::decode(url, "profile reply is not an object"));
    }
    serde_json::from_value(value).map_err(|e| ReportflowError::decode(url, e.to_string()))
}

/// Extracts column descriptions from a metadata reply.
///
/// The first of `columns_keys` holding a list wins. Otherwise a bare list is
/// the column list, and any other non-null value is a single description.
#[must_use]
pub fn normalize_metadata(mut value: Value, columns_keys: &[String]) -> MetadataResult {
    if let Value::Object(map) = &mut value {
        map.remove(USAGE_KEY);
    }

    let entries: Vec<Value> = match &value {
        Value::Object(map) => columns_keys
            .iter()
            .find_map(|key| map.get(key).and_then(Value::as_array).cloned())
            .unwrap_or_else(|| vec![value.clone()]),
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };

    MetadataResult {
        column_descriptions: entries.into_iter().map(column_from_value).collect(),
        raw: value,
    }
}

fn column_from_value(value: Value) -> ColumnDescription {
    match value {
        Value::Object(map) => serde_json::from_value(Value::Object(map.clone())).unwrap_or(ColumnDescription {
            extra: map,
            ..ColumnDescription::default()
        }),
        Value::String(text) => ColumnDescription {
            description: Some(text),
            ..ColumnDescription::default()
        },
        other => ColumnDescription {
            description: Some(other.to_string()),
            ..ColumnDescription::default()
        },
    }
}

/// Extracts the task list from a planning reply.
///
/// A `tasks` field wins; a bare list is the task list; any other object is a
/// single task. Scalars yield an empty plan.
#[must_use]
pub fn normalize_plan(value: Value) -> Plan {
    let entries: Vec<Value> = match value {
        Value::Object(mut map) => {
            map.remove(USAGE_KEY);
            match map.remove("tasks") {
                Some(Value::Array(tasks)) => tasks,
                Some(Value::Null) => Vec::new(),
                Some(single) => vec![single],
                None => vec![Value::Object(map)],
            }
        }
        Value::Array(tasks) => tasks,
        _ => Vec::new(),
    };

    Plan::new(entries.into_iter().map(task_from_value).collect())
}

fn task_from_value(value: Value) -> Task {
    match value {
        Value::Object(map) => serde_json::from_value(Value::Object(map.clone())).unwrap_or_else(|_| Task {
            parameters: map,
            ..Task::default()
        }),
        Value::String(text) => Task::new(String::new(), text),
        other => Task::default().with_parameter("value", other),
    }
}

/// Reads an execution reply, naming it after `task` when the service omits the name.
pub fn normalize_execution(url: &str, value: Value, task: &Task) -> Result<ExecutionResult> {
    if !value.is_object() {
        return Err(ReportflowError::decode(url, "execution reply is not an object"));
    }
    let mut result: ExecutionResult =
        serde_json::from_value(value).map_err(|e| ReportflowError::decode(url, e.to_string()))?;
    if result.task_name.is_empty() {
        result.task_name = task.display_name().to_string();
    }
    Ok(result)
}

/// Builds the planning request body with a configurable description field.
#[must_use]
pub fn plan_request_body(
    profile: &ProfileResult,
    metadata: &MetadataResult,
    description_field: &str,
    offline_mode: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("sample_data".to_string(), profile.sample_data.clone());
    body.insert(
        description_field.to_string(),
        serde_json::to_value(&metadata.column_descriptions).unwrap_or(Value::Null),
    );
    body.insert("offline_mode".to_string(), Value::Bool(offline_mode));
    Value::Object(body)
}
