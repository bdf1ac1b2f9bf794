use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};
use sha2::{Digest, Sha256, Sha512};

pub struct HashTool;

#[async_trait]
impl Tool for HashTool {
    fn tool_id(&self) -> &str {
        "security.hash"
    }
    fn display_name(&self) -> &str {
        "Hash"
    }
    fn category(&self) -> &str {
        "security"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("digest").with_description("Compute a sha256/sha512 digest of text")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;
        let algorithm = args.get("algorithm").and_then(Value::as_str).unwrap_or("sha256");

        let digest_hex = match algorithm {
            "sha256" => hex::encode(Sha256::digest(text.as_bytes())),
            "sha512" => hex::encode(Sha512::digest(text.as_bytes())),
            other => {
                return Err(FabricError::new(
                    ErrorCode::BadInput,
                    format!("unsupported hash algorithm: {other}"),
                ));
            }
        };

        Ok(json!({ "algorithm": algorithm, "digest": digest_hex }))
    }
}

pub struct Base64Tool;

#[async_trait]
impl Tool for Base64Tool {
    fn tool_id(&self) -> &str {
        "security.base64"
    }
    fn display_name(&self) -> &str {
        "Base64"
    }
    fn category(&self) -> &str {
        "security"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new("encode").with_description("Base64-encode text"),
            Capability::new("decode").with_description("Base64-decode text"),
        ]
    }

    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;

        match capability {
            "encode" => Ok(json!({ "text": BASE64.encode(text.as_bytes()) })),
            "decode" => {
                let bytes = BASE64
                    .decode(text)
                    .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid base64: {e}")))?;
                let decoded = String::from_utf8(bytes)
                    .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("decoded bytes are not valid UTF-8: {e}")))?;
                Ok(json!({ "text": decoded }))
            }
            other => Err(FabricError::new(
                ErrorCode::CapabilityNotFound,
                format!("capability '{other}' not found on tool 'security.base64'"),
            )),
        }
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(HashTool));
    registry.register(std::sync::Arc::new(Base64Tool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_sha256_matches_known_vector() {
        let tool = HashTool;
        let result = tool
            .execute("digest", json!({"text": "", "algorithm": "sha256"}))
            .await
            .unwrap();
        assert_eq!(
            result["digest"],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[tokio::test]
    async fn base64_round_trips() {
        let tool = Base64Tool;
        let encoded = tool
            .execute("encode", json!({"text": "hello world"}))
            .await
            .unwrap();
        let decoded = tool
            .execute("decode", json!({"text": encoded["text"].as_str().unwrap()}))
            .await
            .unwrap();
        assert_eq!(decoded["text"], "hello world");
    }

    #[tokio::test]
    async fn base64_decode_rejects_invalid_input() {
        let tool = Base64Tool;
        let err = tool
            .execute("decode", json!({"text": "not base64!!"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadInput);
    }
}
