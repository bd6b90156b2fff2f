use std::error::Error as StdError;
use std::fmt;

/// Terminal failure of one streamed request.
///
/// Malformed NDJSON lines never show up here; the decoder skips them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Connection refused, aborted or timed out, or the body read failed
    /// part-way through.
    Transport(String),

    /// The endpoint answered with a non-success status before any line was
    /// read.
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Summary of the response body, see [`format_api_error`].
        message: String,
    },
}

impl StreamError {
    pub fn transport(err: impl fmt::Display) -> Self {
        StreamError::Transport(err.to_string())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, StreamError::Transport(_))
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(reason) => write!(f, "Transport error: {reason}"),
            StreamError::UpstreamStatus { status, message } => {
                write!(f, "Upstream returned HTTP {status}: {message}")
            }
        }
    }
}

impl StdError for StreamError {}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reduce an error response body to a single readable line.
///
/// Ollama answers failures with `{"error": "..."}`; OpenAI-style servers nest
/// the text under `error.message`. Anything else is passed through with its
/// whitespace collapsed.
pub fn format_api_error(body: &str) -> String {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return json_value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_api_error_reads_ollama_error_field() {
        let raw = r#"{"error":"model 'nope' not found, try pulling it first"}"#;
        assert_eq!(
            format_api_error(raw),
            "model 'nope' not found, try pulling it first"
        );
    }

    #[test]
    fn format_api_error_reads_nested_message() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"server_error"}}"#;
        assert_eq!(format_api_error(raw), "model overloaded");
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        assert_eq!(format_api_error(r#"{ "status": "failed" }"#), r#"{"status":"failed"}"#);
    }

    #[test]
    fn format_api_error_handles_plaintext_and_empty() {
        assert_eq!(format_api_error("  bad\n gateway "), "bad gateway");
        assert_eq!(format_api_error("   "), "<empty body>");
    }

    #[test]
    fn display_distinguishes_kinds() {
        let transport = StreamError::transport("connection refused");
        let status = StreamError::UpstreamStatus {
            status: 404,
            message: "not found".into(),
        };
        assert!(transport.is_transport());
        assert!(!status.is_transport());
        assert_eq!(transport.to_string(), "Transport error: connection refused");
        assert_eq!(status.to_string(), "Upstream returned HTTP 404: not found");
    }
}
