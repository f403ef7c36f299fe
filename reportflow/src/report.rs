//! Markdown export of the artifact sequence.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::core::{Artifact, ArtifactInsight};
use crate::errors::Result;

/// Title used when the caller has none.
pub const DEFAULT_TITLE: &str = "Analysis Report";

/// File name the front end suggests for exports.
pub const DEFAULT_FILE_NAME: &str = "analysis_report.md";

/// Renders `artifacts` as a Markdown document.
///
/// PNG artifacts whose content is valid base64 are embedded as data URIs.
/// Structured insights become labelled paragraphs and a list of actions;
/// anything else is shown as fenced JSON.
#[must_use]
pub fn render_markdown(title: &str, artifacts: &[Artifact]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {title}\n");
    if artifacts.is_empty() {
        out.push_str("_No artifacts were produced._\n");
        return out;
    }
    let _ = writeln!(out, "_{} artifact(s)_\n", artifacts.len());

    for (position, artifact) in artifacts.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}\n", position + 1, artifact.filename);
        render_content(&mut out, artifact);
        render_insight(&mut out, &artifact.insight);
    }
    out
}

fn render_content(out: &mut String, artifact: &Artifact) {
    let Some(content) = artifact.content.as_deref() else {
        return;
    };
    match STANDARD.decode(content) {
        Ok(_) if is_png(&artifact.filename) => {
            let _ = writeln!(out, "![{}](data:image/png;base64,{content})\n", artifact.filename);
        }
        Ok(bytes) => {
            let _ = writeln!(out, "_Attachment: {} bytes._\n", bytes.len());
        }
        Err(_) => out.push_str("_Attachment content is not valid base64._\n\n"),
    }
}

fn render_insight(out: &mut String, insight: &ArtifactInsight) {
    let Some(structured) = insight.structured() else {
        let value = insight.as_value();
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        let _ = writeln!(out, "```json\n{pretty}\n```\n");
        return;
    };
    if let Some(observation) = &structured.observation {
        let _ = writeln!(out, "**Observation:** {observation}\n");
    }
    if let Some(key) = &structured.insight {
        let _ = writeln!(out, "**Key insight:** {key}\n");
    }
    if let Some(actions) = structured.actionable.as_ref().filter(|a| !a.is_empty()) {
        out.push_str("**Recommended actions:**\n\n");
        for action in actions {
            let _ = writeln!(out, "- {action}");
        }
        out.push('\n');
    }
}

fn is_png(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Renders `artifacts` and writes the document to `path`.
pub async fn write_report(path: impl AsRef<Path>, title: &str, artifacts: &[Artifact]) -> Result<()> {
    let path = path.as_ref();
    let document = render_markdown(title, artifacts);
    tokio::fs::write(path, document.as_bytes()).await?;
    info!(path = %path.display(), artifacts = artifacts.len(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Insight;
    use serde_json::json;

    fn chart() -> Artifact {
        Artifact::new(
            0,
            "calories.png",
            Some("aGVsbG8=".to_string()),
            Insight {
                observation: Some("Calories are right-skewed".to_string()),
                insight: Some("A few dishes dominate".to_string()),
                actionable: Some(vec!["Review outliers".to_string()]),
            },
        )
    }

    #[test]
    fn test_structured_artifact_sections() {
        let doc = render_markdown("Recipes", &[chart()]);

        assert!(doc.starts_with("# Recipes\n"));
        assert!(doc.contains("## 1. calories.png"));
        assert!(doc.contains("![calories.png](data:image/png;base64,aGVsbG8=)"));
        assert!(doc.contains("**Observation:** Calories are right-skewed"));
        assert!(doc.contains("**Key insight:** A few dishes dominate"));
        assert!(doc.contains("- Review outliers"));
    }

    #[test]
    fn test_raw_insight_is_fenced() {
        let artifact = Artifact::new(1, "Output: scan", None, ArtifactInsight::from_value(json!({"rows": 3})));
        let doc = render_markdown(DEFAULT_TITLE, &[artifact]);
        assert!(doc.contains("```json\n{\n  \"rows\": 3\n}\n```"));
        assert!(!doc.contains("data:image"));
    }

    #[test]
    fn test_invalid_base64_not_embedded() {
        let mut artifact = chart();
        artifact.content = Some("not base64!".to_string());
        let doc = render_markdown(DEFAULT_TITLE, &[artifact]);
        assert!(doc.contains("not valid base64"));
        assert!(!doc.contains("data:image"));
    }

    #[test]
    fn test_empty_report() {
        let doc = render_markdown(DEFAULT_TITLE, &[]);
        assert!(doc.contains("No artifacts"));
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);

        write_report(&path, "Recipes", &[chart()]).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, render_markdown("Recipes", &[chart()]));
    }
}
