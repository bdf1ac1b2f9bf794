use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use fabric_safety::is_restricted_path;
use serde_json::{Value, json};

fn resolve(path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path
}

fn check_allowed(path: &Path) -> FabricResult<()> {
    if is_restricted_path(path) {
        return Err(FabricError::new(
            ErrorCode::AccessDenied,
            format!("access to path not allowed: {}", path.display()),
        ));
    }
    Ok(())
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn tool_id(&self) -> &str {
        "io.read_file"
    }
    fn display_name(&self) -> &str {
        "Read File"
    }
    fn category(&self) -> &str {
        "io"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("read").with_description("Read the contents of a file")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let path_str = args["path"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'path' argument"))?;
        let max_lines = args.get("max_lines").and_then(Value::as_u64);

        let path = resolve(path_str);
        check_allowed(&path)?;

        if !path.exists() {
            return Err(FabricError::new(
                ErrorCode::FileNotFound,
                format!("file not found: {path_str}"),
            ));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("read failed: {e}")))?;

        let has_any_line = !content.is_empty();
        let (content, truncated) = if let Some(max_lines) = max_lines {
            if max_lines == 0 {
                (String::new(), has_any_line)
            } else {
                let truncated_content: String = content
                    .lines()
                    .take(max_lines as usize)
                    .collect::<Vec<_>>()
                    .join("\n");
                let was_truncated = content.lines().count() as u64 > max_lines;
                (truncated_content, was_truncated)
            }
        } else {
            (content, false)
        };

        Ok(json!({
            "content": content,
            "truncated": truncated,
            "path": path.to_string_lossy(),
            "size": content.len(),
        }))
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn tool_id(&self) -> &str {
        "io.write_file"
    }
    fn display_name(&self) -> &str {
        "Write File"
    }
    fn category(&self) -> &str {
        "io"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("write").with_description("Write content to a file")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let path_str = args["path"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'path' argument"))?;
        let content = args["content"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'content' argument"))?;
        let append = args.get("append").and_then(Value::as_bool).unwrap_or(false);

        let path = resolve(path_str);
        check_allowed(&path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("mkdir failed: {e}")))?;
        }

        if append {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .await
                .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("open failed: {e}")))?;
            file.write_all(content.as_bytes())
                .await
                .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("write failed: {e}")))?;
        } else {
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("write failed: {e}")))?;
        }

        Ok(json!({
            "bytes_written": content.len(),
            "path": path.to_string_lossy(),
            "append": append,
        }))
    }
}

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn tool_id(&self) -> &str {
        "io.list_directory"
    }
    fn display_name(&self) -> &str {
        "List Directory"
    }
    fn category(&self) -> &str {
        "io"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("list").with_description("List directory contents")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let path_str = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let path = resolve(path_str);
        check_allowed(&path)?;

        if !path.exists() {
            return Err(FabricError::new(
                ErrorCode::FileNotFound,
                format!("directory not found: {path_str}"),
            ));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("list failed: {e}")))?;
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FabricError::new(ErrorCode::ExecutionError, format!("list failed: {e}")))?
        {
            let metadata = entry.metadata().await.ok();
            let is_dir = metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "type": if is_dir { "directory" } else { "file" },
                "size": metadata.as_ref().map(|m| m.len()),
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": path.to_string_lossy(),
            "count": entries.len(),
            "entries": entries,
        }))
    }
}

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn tool_id(&self) -> &str {
        "io.search_files"
    }
    fn display_name(&self) -> &str {
        "Search Files"
    }
    fn category(&self) -> &str {
        "io"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("search").with_description("Search file contents with a regex pattern")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let path_str = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let pattern = args["pattern"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'pattern' argument"))?;

        let regex = regex::Regex::new(pattern)
            .map_err(|e| FabricError::new(ErrorCode::InvalidRegex, format!("invalid regex: {e}")))?;

        let root = resolve(path_str);
        check_allowed(&root)?;
        if !root.exists() {
            return Err(FabricError::new(
                ErrorCode::FileNotFound,
                format!("directory not found: {path_str}"),
            ));
        }

        let mut matches = Vec::new();
        let mut files_searched = 0u64;
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(r) => r,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = read_dir.next_entry().await {
                let entry_path = entry.path();
                let is_dir = entry.metadata().await.map(|m| m.is_dir()).unwrap_or(false);
                if is_dir {
                    stack.push(entry_path);
                    continue;
                }
                files_searched += 1;
                let Ok(text) = tokio::fs::read_to_string(&entry_path).await else {
                    continue;
                };
                for (line_no, line) in text.lines().enumerate() {
                    if regex.is_match(line) {
                        matches.push(json!({
                            "file": entry_path.strip_prefix(&root).unwrap_or(&entry_path).to_string_lossy(),
                            "line": line_no + 1,
                            "text": line.chars().take(200).collect::<String>(),
                        }));
                    }
                }
            }
        }

        Ok(json!({
            "files_searched": files_searched,
            "total_matches": matches.len(),
            "matches": matches,
        }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(ReadFileTool));
    registry.register(std::sync::Arc::new(WriteFileTool));
    registry.register(std::sync::Arc::new(ListDirectoryTool));
    registry.register(std::sync::Arc::new(SearchFilesTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_max_lines_zero_yields_empty_and_truncated_true() {
        let dir = tempfile_dir();
        let file = dir.join("a.txt");
        tokio::fs::write(&file, "line1\nline2\n").await.unwrap();

        let tool = ReadFileTool;
        let result = tool
            .execute(
                "read",
                json!({"path": file.to_string_lossy(), "max_lines": 0}),
            )
            .await
            .unwrap();
        assert_eq!(result["content"], "");
        assert_eq!(result["truncated"], true);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile_dir();
        let file = dir.join("b.txt");

        let write = WriteFileTool;
        write
            .execute(
                "write",
                json!({"path": file.to_string_lossy(), "content": "hello"}),
            )
            .await
            .unwrap();

        let read = ReadFileTool;
        let result = read
            .execute("read", json!({"path": file.to_string_lossy()}))
            .await
            .unwrap();
        assert_eq!(result["content"], "hello");
    }

    #[tokio::test]
    async fn restricted_path_is_denied() {
        let tool = ReadFileTool;
        let err = tool
            .execute("read", json!({"path": "/etc/shadow"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccessDenied);
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fabric-io-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
