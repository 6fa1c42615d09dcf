/// Generic HTTP call node
///
/// URL, header values and body are rendered through the template grammar.
/// Object/array bodies go out as JSON, string bodies as text/plain.
/// Network failures and non-2xx responses are transient errors; an
/// unsupported method, a malformed URL or an invalid header is a
/// configuration error.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handler::NodeHandler;
use crate::workflow::types::{Node, NodeConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub struct HttpRequestHandler {
    client: reqwest::Client,
}

impl HttpRequestHandler {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpRequestHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for HttpRequestHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::HttpRequest(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not an http_request node", node.id)));
        };

        let url = ctx.render(&config.url)?;
        let method = config.method.to_uppercase();

        let mut request_builder = match method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            "PATCH" => self.client.patch(&url),
            _ => return Err(NodeError::config(format!("Unsupported HTTP method: {}", config.method))),
        };

        for (key, value) in &config.headers {
            request_builder = request_builder.header(key.as_str(), ctx.render(value)?);
        }

        if let Some(body) = &config.body {
            let body = ctx.render_value(body)?;
            tracing::debug!("📦 Request body: {}", body);
            request_builder = match body {
                Value::String(text) => request_builder.header("Content-Type", "text/plain").body(text),
                Value::Null => request_builder,
                other => request_builder.json(&other),
            };
        }

        tracing::debug!("🌍 HTTP Request: {} {}", method, url);
        // Builder errors (bad URL, invalid header) fail identically on every attempt
        let response = request_builder.send().await.map_err(|e| {
            if e.is_builder() {
                NodeError::config(format!("Invalid HTTP request to {}: {}", url, e))
            } else {
                NodeError::transient(format!("HTTP request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| NodeError::transient(format!("Failed to read response body from {}: {}", url, e)))?;

        if !status.is_success() {
            return Err(NodeError::transient(format!("{} {} returned status {}: {}", method, url, status, text)));
        }

        // Parse response body as JSON if possible, otherwise keep it as text
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        tracing::info!("✅ HTTP request completed: {} {} (status: {})", method, url, status);
        Ok(json!({
            "status": status.as_u16(),
            "headers": headers,
            "body": body,
        }))
    }
}
