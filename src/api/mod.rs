use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE_USER: &str = "user";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// One NDJSON line of a streamed chat reply.
///
/// Fields are kept as raw JSON values and read through the accessors below.
/// A field of an unexpected type reads as absent instead of failing the
/// whole line, so a stray metadata value never costs the text next to it.
#[derive(Deserialize, Debug, Default)]
pub struct ChatEnvelope {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub done: Option<Value>,
    #[serde(default)]
    pub done_reason: Option<Value>,
    #[serde(default)]
    pub eval_count: Option<Value>,
    #[serde(default)]
    pub prompt_eval_count: Option<Value>,
    #[serde(default)]
    pub total_duration: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ChatEnvelope {
    /// `message.content`, when it is a string.
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref()?.get("content")?.as_str()
    }

    pub fn is_done(&self) -> bool {
        self.done.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn done_reason(&self) -> Option<&str> {
        self.done_reason.as_ref().and_then(Value::as_str)
    }

    pub fn eval_count(&self) -> Option<u64> {
        self.eval_count.as_ref().and_then(Value::as_u64)
    }

    pub fn prompt_eval_count(&self) -> Option<u64> {
        self.prompt_eval_count.as_ref().and_then(Value::as_u64)
    }

    /// Nanoseconds.
    pub fn total_duration(&self) -> Option<u64> {
        self.total_duration.as_ref().and_then(Value::as_u64)
    }

    /// In-stream error text. Object errors use their `message` when present.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(
                other
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| other.to_string(), str::to_string),
            ),
        }
    }
}
