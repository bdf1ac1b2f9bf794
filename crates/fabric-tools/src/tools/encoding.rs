use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};

pub struct UrlEncodingTool;

#[async_trait]
impl Tool for UrlEncodingTool {
    fn tool_id(&self) -> &str {
        "encoding.url"
    }
    fn display_name(&self) -> &str {
        "URL Encoding"
    }
    fn category(&self) -> &str {
        "encoding"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new("encode").with_description("Percent-encode text for use in a URL"),
            Capability::new("decode").with_description("Percent-decode a URL-encoded string"),
        ]
    }

    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;

        match capability {
            "encode" => Ok(json!({ "text": urlencoding::encode(text).into_owned() })),
            "decode" => {
                let decoded = urlencoding::decode(text)
                    .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid percent-encoding: {e}")))?;
                Ok(json!({ "text": decoded.into_owned() }))
            }
            other => Err(FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{other}' not found on tool 'encoding.url'"),
            )),
        }
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(UrlEncodingTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encode_then_decode_round_trips() {
        let tool = UrlEncodingTool;
        let encoded = tool
            .execute("encode", json!({"text": "a b&c"}))
            .await
            .unwrap();
        let decoded = tool
            .execute("decode", json!({"text": encoded["text"].as_str().unwrap()}))
            .await
            .unwrap();
        assert_eq!(decoded["text"], "a b&c");
    }
}
