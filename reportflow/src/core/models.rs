//! Request and response models exchanged with the remote services.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;

/// The user-selected file, forwarded to the upload stage as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    name: String,
    bytes: Arc<Vec<u8>>,
    content_type: Option<String>,
}

impl InputFile {
    /// Creates an input file from a name and its contents.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::new(bytes.into()),
            content_type: None,
        }
    }

    /// Sets the MIME type sent with the multipart upload.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reads a file from disk, naming it after its final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, bytes))
    }

    /// The original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The MIME type, if one was set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl std::fmt::Debug for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

// Observers only need to know which file is selected, not its bytes.
impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("InputFile", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("size", &self.bytes.len())?;
        state.serialize_field("content_type", &self.content_type)?;
        state.end()
    }
}

/// Reply of the upload stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Where the service stored the file.
    #[serde(rename = "file_path")]
    pub remote_file_path: String,
}

/// Reply of the profile stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResult {
    /// Sample rows, opaque to the orchestrator.
    #[serde(default)]
    pub sample_data: Value,
    /// Summary statistics (mapping or array).
    #[serde(default)]
    pub description: Value,
    /// Column name to declared type.
    #[serde(default)]
    pub schema_info: Map<String, Value>,
}

/// Semantic description of one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared or inferred type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other fields the service returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColumnDescription {
    /// Best available human-readable text: description, then `summary`.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.extra.get("summary").and_then(Value::as_str))
    }
}

/// Reply of the metadata stage, normalized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataResult {
    /// Per-column descriptions, in service order.
    #[serde(rename = "supervisor_description", default)]
    pub column_descriptions: Vec<ColumnDescription>,
    /// The response as received, before normalization.
    #[serde(rename = "metadata_json", default)]
    pub raw: Value,
}

/// One unit of planned analysis work.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Task {
    /// Task name.
    #[serde(default)]
    pub name: String,
    /// What the task should analyse.
    #[serde(default)]
    pub description: String,
    /// Task-specific parameters, sent back verbatim on execution.
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl Task {
    /// Creates a task with a name and description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Map::new(),
        }
    }

    /// Adds a task parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Name used in logs and events.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "unnamed_task"
        } else {
            &self.name
        }
    }
}

/// Reply of the planning stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Tasks in execution order.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Creates a plan from tasks.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing was planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A file produced by task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Output file name.
    pub filename: String,
    /// Base64-encoded contents.
    #[serde(default)]
    pub content_base64: Option<String>,
}

/// Reply of the execute stage for one task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Name of the executed task.
    #[serde(default)]
    pub task_name: String,
    /// Files produced by the task.
    #[serde(default)]
    pub artifacts: Vec<ArtifactFile>,
    /// Interpretation of the output: structured or arbitrary JSON.
    #[serde(default)]
    pub insights: Option<Value>,
    /// Captured standard output.
    #[serde(default)]
    pub stdout: Option<String>,
    /// Captured standard error.
    #[serde(default)]
    pub stderr: Option<String>,
    /// Generated code that was executed.
    #[serde(default)]
    pub code: Option<String>,
}
