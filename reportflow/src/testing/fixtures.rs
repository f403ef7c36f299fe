//! Canned stage results for tests.

use serde_json::{json, Map, Value};

use crate::core::{
    ArtifactFile, ColumnDescription, ExecutionResult, InputFile, MetadataResult, Plan,
    ProfileResult, Task, UploadResult,
};

use super::mocks::{ScriptedReply, ScriptedTransport};

/// A small CSV input.
#[must_use]
pub fn sample_input() -> InputFile {
    InputFile::new("recipes.csv", b"name,calories\npasta,600\nsalad,150\n".to_vec())
        .with_content_type("text/csv")
}

/// Upload reply for [`sample_input`].
#[must_use]
pub fn sample_upload() -> UploadResult {
    UploadResult {
        remote_file_path: "/srv/data/recipes.csv".to_string(),
    }
}

/// Profile reply with two columns.
#[must_use]
pub fn sample_profile() -> ProfileResult {
    let mut schema = Map::new();
    schema.insert("name".to_string(), json!("String"));
    schema.insert("calories".to_string(), json!("Int64"));
    ProfileResult {
        sample_data: json!([{"name": "pasta", "calories": 600}]),
        description: json!({"calories": {"mean": 375.0}}),
        schema_info: schema,
    }
}

/// Metadata reply describing both columns.
#[must_use]
pub fn sample_metadata() -> MetadataResult {
    let columns = vec![
        ColumnDescription {
            name: Some("name".to_string()),
            column_type: Some("categorical".to_string()),
            description: Some("Recipe name".to_string()),
            extra: Map::new(),
        },
        ColumnDescription {
            name: Some("calories".to_string()),
            column_type: Some("numeric".to_string()),
            description: Some("Energy per serving".to_string()),
            extra: Map::new(),
        },
    ];
    MetadataResult {
        raw: json!({"columns": serde_json::to_value(&columns).unwrap_or(Value::Null)}),
        column_descriptions: columns,
    }
}

/// A plan with one task per name.
#[must_use]
pub fn plan_of(names: &[&str]) -> Plan {
    Plan::new(
        names
            .iter()
            .map(|name| Task::new(*name, format!("Analyse {name}")))
            .collect(),
    )
}

/// A task result with a single image artifact.
#[must_use]
pub fn execution_with_artifact(task_name: &str) -> ExecutionResult {
    ExecutionResult {
        task_name: task_name.to_string(),
        artifacts: vec![ArtifactFile {
            filename: format!("{task_name}.png"),
            content_base64: Some("aGVsbG8=".to_string()),
        }],
        insights: Some(json!({"observation": format!("{task_name} observed")})),
        ..ExecutionResult::default()
    }
}

/// A task result with only standard output.
#[must_use]
pub fn execution_with_stdout(task_name: &str, stdout: &str) -> ExecutionResult {
    ExecutionResult {
        task_name: task_name.to_string(),
        stdout: Some(stdout.to_string()),
        ..ExecutionResult::default()
    }
}

/// A single-host transport scripted for a full successful run over `tasks`.
///
/// Every task execution returns one artifact named after the first task.
#[must_use]
pub fn scripted_single_host(tasks: &[&str]) -> ScriptedTransport {
    let plan = plan_of(tasks);
    let first = tasks.first().copied().unwrap_or("task");
    ScriptedTransport::new()
        .on("/upload", [ScriptedReply::ok(json!({"file_path": "/srv/data/recipes.csv", "message": "ok"}))])
        .on("/profile", [ScriptedReply::ok(serde_json::to_value(sample_profile()).unwrap_or(Value::Null))])
        .on(
            "/metadata",
            [ScriptedReply::ok(json!({
                "metadata_json": {},
                "supervisor_description": [{"name": "calories", "type": "numeric", "description": "Energy"}]
            }))],
        )
        .on("/supervisor", [ScriptedReply::ok(serde_json::to_value(plan).unwrap_or(Value::Null))])
        .on(
            "/execute_task",
            [ScriptedReply::ok(serde_json::to_value(execution_with_artifact(first)).unwrap_or(Value::Null))],
        )
}
