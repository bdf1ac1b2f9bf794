use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};

pub struct JsonTool;

#[async_trait]
impl Tool for JsonTool {
    fn tool_id(&self) -> &str {
        "data.json"
    }
    fn display_name(&self) -> &str {
        "JSON"
    }
    fn category(&self) -> &str {
        "data"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new("parse").with_description("Parse a JSON string into a value"),
            Capability::new("stringify").with_description("Serialize a value to a JSON string"),
        ]
    }

    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
        match capability {
            "parse" => {
                let text = args["text"]
                    .as_str()
                    .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;
                let parsed: Value = serde_json::from_str(text).map_err(|e| {
                    FabricError::new(ErrorCode::BadInput, format!("invalid JSON: {e}"))
                })?;
                Ok(json!({ "value": parsed }))
            }
            "stringify" => {
                let value = args
                    .get("value")
                    .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'value' argument"))?;
                let pretty = args.get("pretty").and_then(Value::as_bool).unwrap_or(false);
                let text = if pretty {
                    serde_json::to_string_pretty(value)
                } else {
                    serde_json::to_string(value)
                }
                .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("serialize failed: {e}")))?;
                Ok(json!({ "text": text }))
            }
            other => Err(FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{other}' not found on tool 'data.json'"),
            )),
        }
    }
}

pub struct CsvTool;

#[async_trait]
impl Tool for CsvTool {
    fn tool_id(&self) -> &str {
        "data.csv"
    }
    fn display_name(&self) -> &str {
        "CSV"
    }
    fn category(&self) -> &str {
        "data"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("parse").with_description("Parse CSV text into rows of records")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;
        let has_headers = args.get("has_headers").and_then(Value::as_bool).unwrap_or(true);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(has_headers)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = if has_headers {
            reader
                .headers()
                .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid CSV header: {e}")))?
                .iter()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid CSV row: {e}")))?;
            if has_headers {
                let mut row = serde_json::Map::new();
                for (key, value) in headers.iter().zip(record.iter()) {
                    row.insert(key.clone(), json!(value));
                }
                rows.push(Value::Object(row));
            } else {
                rows.push(json!(record.iter().collect::<Vec<_>>()));
            }
        }

        Ok(json!({ "rows": rows, "count": rows.len() }))
    }
}

pub struct SchemaTool;

#[async_trait]
impl Tool for SchemaTool {
    fn tool_id(&self) -> &str {
        "data.schema"
    }
    fn display_name(&self) -> &str {
        "Schema Validation"
    }
    fn category(&self) -> &str {
        "data"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("validate").with_description("Validate a value against a JSON Schema")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let schema = args
            .get("schema")
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'schema' argument"))?;
        let instance = args
            .get("value")
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'value' argument"))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid schema: {e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e} at {}", e.instance_path))
            .collect();

        Ok(json!({
            "valid": errors.is_empty(),
            "errors": errors,
        }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(JsonTool));
    registry.register(std::sync::Arc::new(CsvTool));
    registry.register(std::sync::Arc::new(SchemaTool));
}
