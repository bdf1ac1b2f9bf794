use async_trait::async_trait;
use chrono::Utc;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use serde_json::{Value, json};

pub struct ExecTool;

#[async_trait]
impl Tool for ExecTool {
    fn tool_id(&self) -> &str {
        "system.exec"
    }
    fn display_name(&self) -> &str {
        "Execute Command"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("run")
            .with_description("Run a shell command, rejecting destructive patterns")
            .with_timeout(30_000)]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'command' argument"))?;

        if let Some(pattern) = fabric_safety::guard_command(command) {
            return Err(FabricError::new(
                ErrorCode::AccessDenied,
                format!("command blocked by safety policy: {pattern}"),
            ));
        }

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("spawn failed: {e}")))?;

        Ok(json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "exit_code": output.status.code(),
        }))
    }
}

pub struct EnvTool;

#[async_trait]
impl Tool for EnvTool {
    fn tool_id(&self) -> &str {
        "system.env"
    }
    fn display_name(&self) -> &str {
        "Environment"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("get").with_description("Read an environment variable")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let name = args["name"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'name' argument"))?;

        // Deny-listed the same way restricted filesystem paths are: names that
        // commonly carry credentials never leave this tool.
        let lowered = name.to_lowercase();
        if lowered.contains("key") || lowered.contains("secret") || lowered.contains("token") || lowered.contains("password") {
            return Err(FabricError::new(
                ErrorCode::AccessDenied,
                format!("access to variable '{name}' not allowed"),
            ));
        }

        match std::env::var(name) {
            Ok(value) => Ok(json!({ "name": name, "value": value, "present": true })),
            Err(_) => Ok(json!({ "name": name, "value": Value::Null, "present": false })),
        }
    }
}

pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn tool_id(&self) -> &str {
        "system.clock"
    }
    fn display_name(&self) -> &str {
        "Clock"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("now").with_description("Return the current UTC time")]
    }

    async fn execute(&self, _capability: &str, _args: Value) -> FabricResult<Value> {
        let now = Utc::now();
        Ok(json!({
            "iso8601": now.to_rfc3339(),
            "unix_ms": now.timestamp_millis(),
        }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(ExecTool));
    registry.register(std::sync::Arc::new(EnvTool));
    registry.register(std::sync::Arc::new(ClockTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exec_blocks_destructive_command() {
        let tool = ExecTool;
        let err = tool
            .execute("run", json!({"command": "rm -rf /"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccessDenied);
    }

    #[tokio::test]
    async fn exec_runs_benign_command() {
        let tool = ExecTool;
        let result = tool
            .execute("run", json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert_eq!(result["stdout"].as_str().unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn env_denies_secret_looking_names() {
        let tool = EnvTool;
        let err = tool
            .execute("get", json!({"name": "API_SECRET_KEY"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccessDenied);
    }

    #[tokio::test]
    async fn clock_returns_iso8601() {
        let tool = ClockTool;
        let result = tool.execute("now", json!({})).await.unwrap();
        assert!(result["iso8601"].as_str().unwrap().contains('T'));
    }
}
