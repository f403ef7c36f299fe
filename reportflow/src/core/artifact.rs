//! Aggregated artifact type surfaced to observers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured interpretation of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insight {
    /// What the output shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    /// Why it matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    /// Recommended follow-up actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actionable: Option<Vec<String>>,
}

impl Insight {
    /// An insight carrying only an observation.
    #[must_use]
    pub fn observation(text: impl Into<String>) -> Self {
        Self {
            observation: Some(text.into()),
            ..Self::default()
        }
    }
}

/// The insight attached to an artifact, kept exactly as the service sent it.
///
/// Services usually return `{observation, insight, actionable}`; that view is
/// available through [`ArtifactInsight::structured`] while every other key
/// survives serialization untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactInsight(Value);

impl ArtifactInsight {
    /// Wraps a JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The value as received.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// The known fields, if the value is an object carrying at least one.
    ///
    /// Non-string entries are rendered as compact JSON.
    #[must_use]
    pub fn structured(&self) -> Option<Insight> {
        let object = self.0.as_object()?;
        let observation = object.get("observation").and_then(text);
        let insight = object.get("insight").and_then(text);
        let actionable = object
            .get("actionable")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(text).collect::<Vec<_>>());

        if observation.is_none() && insight.is_none() && actionable.is_none() {
            return None;
        }
        Some(Insight {
            observation,
            insight,
            actionable,
        })
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<Value> for ArtifactInsight {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Insight> for ArtifactInsight {
    fn from(insight: Insight) -> Self {
        let mut object = Map::new();
        if let Some(observation) = insight.observation {
            object.insert("observation".to_string(), Value::String(observation));
        }
        if let Some(key) = insight.insight {
            object.insert("insight".to_string(), Value::String(key));
        }
        if let Some(actions) = insight.actionable {
            object.insert(
                "actionable".to_string(),
                Value::Array(actions.into_iter().map(Value::String).collect()),
            );
        }
        Self(Value::Object(object))
    }
}

/// One named output of a task, with its interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Position of the producing task in the plan.
    pub task_index: usize,
    /// Output name.
    pub filename: String,
    /// Base64-encoded contents, absent for text-only outputs.
    pub content: Option<String>,
    /// Interpretation of the output.
    pub insight: ArtifactInsight,
}

impl Artifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(
        task_index: usize,
        filename: impl Into<String>,
        content: Option<String>,
        insight: impl Into<ArtifactInsight>,
    ) -> Self {
        Self {
            task_index,
            filename: filename.into(),
            content,
            insight: insight.into(),
        }
    }
}
