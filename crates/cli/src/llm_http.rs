use anyhow::{Context, Result};
use async_trait::async_trait;
use expertmatch_search::{CompletionClient, CompletionResponse, SearchError, ToolInvocation};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const URL_ENV: &str = "EXPERTMATCH_LLM_URL";
pub const MODEL_ENV: &str = "EXPERTMATCH_LLM_MODEL";
pub const API_KEY_ENV: &str = "EXPERTMATCH_LLM_API_KEY";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize, Default)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// OpenAI-compatible chat completion client.
pub struct HttpCompletionClient {
    http_client: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Default)]
pub struct HttpCompletionClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl HttpCompletionClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<HttpCompletionClient> {
        let base_url = self
            .base_url
            .context("completion endpoint URL is required")?
            .trim_end_matches('/')
            .to_string();
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpCompletionClient {
            http_client,
            base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

impl HttpCompletionClient {
    pub fn builder() -> HttpCompletionClientBuilder {
        HttpCompletionClientBuilder::default()
    }

    /// Client configured from the environment; `None` when no URL is set.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(url) = std::env::var(URL_ENV) else {
            return Ok(None);
        };
        if url.trim().is_empty() {
            return Ok(None);
        }
        let mut builder = Self::builder().base_url(url);
        if let Ok(model) = std::env::var(MODEL_ENV) {
            builder = builder.model(model);
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            builder = builder.api_key(key);
        }
        builder.build().map(Some)
    }

    async fn send(&self, prompt: &str) -> std::result::Result<AssistantMessage, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };
        log::debug!("Sending completion request to {url} (model {})", self.model);

        let mut call = self.http_client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await.map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => format!("unauthorized ({status}); check {API_KEY_ENV}"),
                429 => "rate limited by completion endpoint".to_string(),
                404 => format!("model or endpoint not found: {body}"),
                _ => format!("HTTP error {status}: {body}"),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to decode response: {e}"))?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| "empty response from completion endpoint".to_string())
    }
}

/// Decides the response shape once, at the adapter boundary.
fn classify(message: AssistantMessage) -> CompletionResponse {
    let text = message.content.unwrap_or_default();
    let mut calls: Vec<ToolInvocation> = message
        .tool_calls
        .into_iter()
        .map(|call| ToolInvocation {
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments)),
            name: call.function.name,
        })
        .collect();
    match (text.trim().is_empty(), calls.len()) {
        (_, 0) => CompletionResponse::TextOnly(text),
        (true, 1) => {
            let call = calls.remove(0);
            CompletionResponse::ToolCall {
                name: call.name,
                arguments: call.arguments,
            }
        }
        _ => CompletionResponse::Mixed {
            text,
            tool_calls: calls,
        },
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> expertmatch_search::Result<CompletionResponse> {
        let message = self.send(prompt).await.map_err(SearchError::Completion)?;
        Ok(classify(message))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(raw: Value) -> AssistantMessage {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn plain_content_is_text_only() {
        let response = classify(message(json!({"content": "[1]"})));
        assert_eq!(response, CompletionResponse::TextOnly("[1]".into()));
    }

    #[test]
    fn lone_tool_call_is_decoded() {
        let response = classify(message(json!({
            "content": null,
            "tool_calls": [{"function": {"name": "rank", "arguments": "{\"a\": 1}"}}]
        })));
        assert_eq!(
            response,
            CompletionResponse::ToolCall {
                name: "rank".into(),
                arguments: json!({"a": 1}),
            }
        );
    }

    #[test]
    fn text_with_tool_calls_is_mixed() {
        let response = classify(message(json!({
            "content": "see tool",
            "tool_calls": [{"function": {"name": "rank", "arguments": "not json"}}]
        })));
        match response {
            CompletionResponse::Mixed { text, tool_calls } => {
                assert_eq!(text, "see tool");
                assert_eq!(tool_calls[0].arguments, json!("not json"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn builder_requires_url_and_redacts_key() {
        assert!(HttpCompletionClient::builder().build().is_err());
        let client = HttpCompletionClient::builder()
            .base_url("http://localhost:8080/v1/")
            .api_key("secret")
            .build()
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model_name(), DEFAULT_MODEL);
        assert!(!format!("{client:?}").contains("secret"));
    }
}
