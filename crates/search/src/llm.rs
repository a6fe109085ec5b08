use crate::error::{Result, SearchError};
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// Shape of a completion, decided once by the client adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResponse {
    TextOnly(String),
    ToolCall { name: String, arguments: Value },
    Mixed {
        text: String,
        tool_calls: Vec<ToolInvocation>,
    },
}

impl CompletionResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::TextOnly(text.into())
    }

    /// Text to parse: the message body, or the tool arguments when the model
    /// answered purely with a tool call.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::TextOnly(text) => Cow::Borrowed(text),
            Self::ToolCall { arguments, .. } => Cow::Owned(arguments.to_string()),
            Self::Mixed { text, tool_calls } => {
                if text.trim().is_empty() {
                    tool_calls
                        .first()
                        .map(|call| Cow::Owned(call.arguments.to_string()))
                        .unwrap_or(Cow::Borrowed(text))
                } else {
                    Cow::Borrowed(text)
                }
            }
        }
    }

    #[must_use]
    pub fn tool_calls(&self) -> Vec<ToolInvocation> {
        match self {
            Self::TextOnly(_) => Vec::new(),
            Self::ToolCall { name, arguments } => vec![ToolInvocation {
                name: name.clone(),
                arguments: arguments.clone(),
            }],
            Self::Mixed { tool_calls, .. } => tool_calls.clone(),
        }
    }
}

/// Language-model completion seam. Implementations must not cache.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Body of the first markdown code fence in `text`, or the trimmed text when
/// there is none. An unterminated fence runs to the end of the text.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };
    let after_ticks = &text[open + 3..];
    // skip the info string ("json", "JSON", ...)
    let body = match after_ticks.find('\n') {
        Some(newline) => &after_ticks[newline + 1..],
        None => after_ticks.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// JSON payload in a model response: fenced or bare, with any prose around
/// it ignored.
#[must_use]
pub fn extract_json_text(text: &str) -> Option<&str> {
    let stripped = strip_code_fences(text);
    if stripped.starts_with('{') || stripped.starts_with('[') {
        return Some(stripped);
    }
    let start = stripped.find(['{', '['])?;
    let closer = if stripped[start..].starts_with('{') { '}' } else { ']' };
    let end = stripped.rfind(closer)?;
    (end > start).then(|| &stripped[start..=end])
}

pub(crate) fn parse_json_value(text: &str, stage: &'static str) -> Result<Value> {
    let payload = extract_json_text(text).ok_or_else(|| SearchError::ModelResponseUnparseable {
        stage,
        message: "no JSON payload found".to_string(),
    })?;
    serde_json::from_str(payload).map_err(|e| SearchError::ModelResponseUnparseable {
        stage,
        message: e.to_string(),
    })
}
