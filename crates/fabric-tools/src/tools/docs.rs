use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use pulldown_cmark::{Options, html};
use serde_json::{Value, json};

pub struct MarkdownTool;

#[async_trait]
impl Tool for MarkdownTool {
    fn tool_id(&self) -> &str {
        "docs.markdown"
    }
    fn display_name(&self) -> &str {
        "Markdown"
    }
    fn category(&self) -> &str {
        "docs"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("render").with_description("Render markdown text to HTML")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let text = args["text"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'text' argument"))?;

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = pulldown_cmark::Parser::new_ext(text, options);

        let mut rendered = String::new();
        html::push_html(&mut rendered, parser);

        Ok(json!({ "html": rendered }))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(MarkdownTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_heading_and_emphasis() {
        let tool = MarkdownTool;
        let result = tool
            .execute("render", json!({"text": "# Title\n\n*em*"}))
            .await
            .unwrap();
        let html = result["html"].as_str().unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>em</em>"));
    }
}
