use std::time::Duration;

use async_trait::async_trait;
use fabric_core::{Capability, ErrorCode, FabricError, FabricResult, Tool};
use fabric_safety::validate_url;
use serde_json::{Value, json};

const MAX_RESPONSE_CHARS: usize = 50_000;
const USER_AGENT: &str = "fabric-gateway/0.1";

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn truncate(text: String) -> (String, bool) {
    if text.len() > MAX_RESPONSE_CHARS {
        let truncated: String = text.chars().take(MAX_RESPONSE_CHARS).collect();
        (truncated, true)
    } else {
        (text, false)
    }
}

pub struct FetchTool {
    client: reqwest::Client,
}

impl Default for FetchTool {
    fn default() -> Self {
        Self { client: client() }
    }
}

#[async_trait]
impl Tool for FetchTool {
    fn tool_id(&self) -> &str {
        "web.fetch"
    }
    fn display_name(&self) -> &str {
        "Fetch"
    }
    fn category(&self) -> &str {
        "web"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new("fetch").with_description("Fetch raw content from a URL"),
            Capability::new("extract_text").with_description("Fetch a page and strip HTML tags"),
        ]
    }

    async fn execute(&self, capability: &str, args: Value) -> FabricResult<Value> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'url' argument"))?;

        validate_url(url).map_err(|e| FabricError::new(ErrorCode::AccessDenied, e))?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("fetch failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("read body failed: {e}")))?;

        let content = match capability {
            "fetch" => body,
            "extract_text" => strip_html_tags(&body),
            other => {
                return Err(FabricError::new(
                    ErrorCode::CapabilityNotFound,
                    format!("capability '{other}' not found on tool 'web.fetch'"),
                ));
            }
        };

        let (content, truncated) = truncate(content);
        Ok(json!({ "status": status, "content": content, "truncated": truncated }))
    }
}

/// Crude tag stripper — good enough for `extract_text`'s "readable body"
/// contract without pulling in a full HTML parser for this one capability.
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct HttpRequestTool {
    client: reqwest::Client,
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self { client: client() }
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn tool_id(&self) -> &str {
        "web.http_request"
    }
    fn display_name(&self) -> &str {
        "HTTP Request"
    }
    fn category(&self) -> &str {
        "web"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("request")
            .with_description("Make a GET/POST/PUT/PATCH/DELETE HTTP request")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'url' argument"))?;
        validate_url(url).map_err(|e| FabricError::new(ErrorCode::AccessDenied, e))?;

        let method = args.get("method").and_then(Value::as_str).unwrap_or("GET").to_uppercase();
        let mut request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "PATCH" => self.client.patch(url),
            "DELETE" => self.client.delete(url),
            other => {
                return Err(FabricError::new(
                    ErrorCode::BadInput,
                    format!("unsupported HTTP method: {other}"),
                ));
            }
        };

        if let Some(headers) = args.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key.as_str(), v);
                }
            }
        }

        if let Some(body) = args.get("body") {
            request = if body.is_string() {
                request.header("Content-Type", "text/plain").body(body.as_str().unwrap().to_string())
            } else {
                request.json(body)
            };
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("request failed: {e}")))?;

        let status = resp.status().as_u16();
        let headers: serde_json::Map<String, Value> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), json!(v))))
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| FabricError::new(ErrorCode::UpstreamError, format!("read body failed: {e}")))?;
        let (body, truncated) = truncate(body);

        Ok(json!({
            "status": status,
            "headers": headers,
            "body": body,
            "truncated": truncated,
        }))
    }
}

pub struct ParseUrlTool;

#[async_trait]
impl Tool for ParseUrlTool {
    fn tool_id(&self) -> &str {
        "web.parse_url"
    }
    fn display_name(&self) -> &str {
        "Parse URL"
    }
    fn category(&self) -> &str {
        "web"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("parse").with_description("Decompose a URL into its components")]
    }

    async fn execute(&self, _capability: &str, args: Value) -> FabricResult<Value> {
        let url_str = args["url"]
            .as_str()
            .ok_or_else(|| FabricError::new(ErrorCode::BadInput, "missing 'url' argument"))?;
        let parsed = url::Url::parse(url_str)
            .map_err(|e| FabricError::new(ErrorCode::BadInput, format!("invalid URL: {e}")))?;

        let query: serde_json::Map<String, Value> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), json!(v.into_owned())))
            .collect();

        Ok(json!({
            "scheme": parsed.scheme(),
            "host": parsed.host_str(),
            "port": parsed.port(),
            "path": parsed.path(),
            "query": query,
            "fragment": parsed.fragment(),
        }))
    }
}

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn tool_id(&self) -> &str {
        "web.search"
    }
    fn display_name(&self) -> &str {
        "Web Search"
    }
    fn category(&self) -> &str {
        "web"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("search").with_description("Search the web (requires an external search provider)")]
    }

    async fn execute(&self, _capability: &str, _args: Value) -> FabricResult<Value> {
        // No search provider is bundled; this stays wired into the registry
        // so `fabric.tool.list` advertises the capability, but calling it
        // without a configured provider surfaces as an upstream dependency
        // gap rather than a missing tool.
        Err(FabricError::new(
            ErrorCode::UpstreamError,
            "no web search provider configured",
        ))
    }
}

pub fn register(registry: &mut crate::ToolRegistry) {
    registry.register(std::sync::Arc::new(FetchTool::default()));
    registry.register(std::sync::Arc::new(HttpRequestTool::default()));
    registry.register(std::sync::Arc::new(ParseUrlTool));
    registry.register(std::sync::Arc::new(SearchTool));
}
