use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};
use similar::{ChangeTag, TextDiff};

pub struct RegexTool;

#[async_trait]
impl Tool for RegexTool {
    fn tool_id(&self) -> &str {
        "text.regex"
    }
    fn display_name(&self) -> &str {
        "Regex"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new("match").with_description("Test whether a pattern matches text"),
            Capability::new("find_all").with_description("Find all non-overlapping matches"),
        ]
    }

    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
        let pattern = args["pattern"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'pattern' argument"))?;
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;

        let regex = regex::Regex::new(pattern)
            .map_err(|e| FabricError::new(ErrorCode::InvalidRegex, format!("invalid regex: {e}")))?;

        match capability {
            "match" => Ok(json!({ "matched": regex.is_match(text) })),
            "find_all" => {
                let matches: Vec<&str> = regex.find_iter(text).map(|m| m.as_str()).collect();
                Ok(json!({ "matches": matches, "count": matches.len() }))
            }
            other => Err(FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{other}' not found on tool 'text.regex'"),
            )),
        }
    }
}

pub struct TransformTool;

#[async_trait]
impl Tool for TransformTool {
    fn tool_id(&self) -> &str {
        "text.transform"
    }
    fn display_name(&self) -> &str {
        "Transform"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("apply")
            .with_description("Apply a pipeline of transforms: upper, lower, trim, replace")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let mut text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?
            .to_string();
        let steps = args["pipeline"].as_array().cloned().unwrap_or_default();

        for step in steps {
            let op = step["op"].as_str().unwrap_or("");
            match op {
                "upper" => text = text.to_uppercase(),
                "lower" => text = text.to_lowercase(),
                "trim" => text = text.trim().to_string(),
                "replace" => {
                    let from = step["from"].as_str().unwrap_or("");
                    let to = step["to"].as_str().unwrap_or("");
                    text = text.replace(from, to);
                }
                other => {
                    return Err(FabricError::new(
                        ErrorCode::BadInput,
                        format!("unknown transform step: {other}"),
                    ));
                }
            }
        }

        Ok(json!({ "text": text }))
    }
}

pub struct DiffTool;

#[async_trait]
impl Tool for DiffTool {
    fn tool_id(&self) -> &str {
        "text.diff"
    }
    fn display_name(&self) -> &str {
        "Diff"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("compare").with_description("Line-level diff between two texts")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let a = args["a"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'a' argument"))?;
        let b = args["b"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'b' argument"))?;

        let diff = TextDiff::from_lines(a, b);
        let mut hunks = Vec::new();
        for change in diff.iter_all_changes() {
            let tag = match change.tag() {
                ChangeTag::Delete => "delete",
                ChangeTag::Insert => "insert",
                ChangeTag::Equal => "equal",
            };
            hunks.push(json!({ "tag": tag, "line": change.value() }));
        }

        Ok(json!({ "hunks": hunks, "ratio": diff.ratio() }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(RegexTool));
    registry.register(std::sync::Arc::new(TransformTool));
    registry.register(std::sync::Arc::new(DiffTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_pattern_matches_every_position() {
        // An empty pattern matches at every position.
        let tool = RegexTool;
        let result = tool
            .execute("match", json!({"pattern": "", "text": "anything"}))
            .await
            .unwrap();
        assert_eq!(result["matched"], true);
    }

    #[tokio::test]
    async fn invalid_regex_rejected() {
        let tool = RegexTool;
        let err = tool
            .execute("match", json!({"pattern": "(unclosed", "text": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRegex);
    }

    #[tokio::test]
    async fn transform_pipeline_runs_in_order() {
        let tool = TransformTool;
        let result = tool
            .execute(
                "apply",
                json!({"text": "  Hello  ", "pipeline": [{"op": "trim"}, {"op": "lower"}]}),
            )
            .await
            .unwrap();
        assert_eq!(result["text"], "hello");
    }

    #[tokio::test]
    async fn diff_reports_insert_and_delete() {
        let tool = DiffTool;
        let result = tool
            .execute("compare", json!({"a": "one\ntwo\n", "b": "one\nthree\n"}))
            .await
            .unwrap();
        let tags: Vec<&str> = result["hunks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["tag"].as_str().unwrap())
            .collect();
        assert!(tags.contains(&"delete"));
        assert!(tags.contains(&"insert"));
    }
}
