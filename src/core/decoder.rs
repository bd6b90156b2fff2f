use serde_json::Value;

use crate::api::ChatEnvelope;

/// What one NDJSON line contributes to the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// `message.content` of a well-formed envelope. May be empty.
    Fragment(String),
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or whitespace-only line.
    Blank,
    /// Not a JSON object.
    Malformed(String),
    /// A valid envelope without a `message.content` string.
    NoContent,
    /// An in-stream `{"error": "..."}` object.
    UpstreamError(String),
}

/// Metadata carried by an envelope with `done: true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub done_reason: Option<String>,
    pub eval_count: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    /// Nanoseconds, as reported by the server.
    pub total_duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub outcome: LineOutcome,
    pub completion: Option<Completion>,
}

impl DecodedLine {
    fn skip(reason: SkipReason) -> Self {
        Self {
            outcome: LineOutcome::Skip(reason),
            completion: None,
        }
    }

    pub fn fragment(&self) -> Option<&str> {
        match &self.outcome {
            LineOutcome::Fragment(text) => Some(text),
            LineOutcome::Skip(_) => None,
        }
    }

    pub fn into_fragment(self) -> Option<String> {
        match self.outcome {
            LineOutcome::Fragment(text) => Some(text),
            LineOutcome::Skip(_) => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.completion.is_some()
    }
}

/// Decode one framed line.
///
/// Never fails: lines that carry no text come back as
/// [`LineOutcome::Skip`] so one bad line cannot end an otherwise healthy
/// stream.
pub fn decode_line(line: &str) -> DecodedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return DecodedLine::skip(SkipReason::Blank);
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(err) => return DecodedLine::skip(SkipReason::Malformed(err.to_string())),
    };
    if !value.is_object() {
        return DecodedLine::skip(SkipReason::Malformed(format!(
            "expected a JSON object, found `{value}`"
        )));
    }
    let envelope = match serde_json::from_value::<ChatEnvelope>(value) {
        Ok(envelope) => envelope,
        Err(err) => return DecodedLine::skip(SkipReason::Malformed(err.to_string())),
    };

    let completion = envelope.is_done().then(|| Completion {
        done_reason: envelope.done_reason().map(str::to_string),
        eval_count: envelope.eval_count(),
        prompt_eval_count: envelope.prompt_eval_count(),
        total_duration: envelope.total_duration(),
    });

    let outcome = match (envelope.content(), envelope.error_message()) {
        (Some(text), _) => LineOutcome::Fragment(text.to_string()),
        (None, Some(error)) => LineOutcome::Skip(SkipReason::UpstreamError(error)),
        (None, None) => LineOutcome::Skip(SkipReason::NoContent),
    };

    DecodedLine {
        outcome,
        completion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(input: &str) -> Vec<String> {
        input
            .split_terminator('\n')
            .filter_map(|line| decode_line(line).into_fragment())
            .collect()
    }

    #[test]
    fn content_line_yields_fragment() {
        let decoded = decode_line(r#"{"model":"gemma2:9b","message":{"role":"assistant","content":"Hi"},"done":false}"#);
        assert_eq!(decoded.outcome, LineOutcome::Fragment("Hi".into()));
        assert!(!decoded.is_done());
    }

    #[test]
    fn malformed_line_is_skipped_without_blocking_later_lines() {
        let input = "{\"message\":{\"content\":\"a\"}}\nNOT_JSON\n{\"message\":{\"content\":\"b\"}}\n";
        assert_eq!(fragments(input), vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(
            decode_line("NOT_JSON").outcome,
            LineOutcome::Skip(SkipReason::Malformed(_))
        ));
    }

    #[test]
    fn done_without_message_is_a_silent_skip() {
        let decoded = decode_line(r#"{"done":true}"#);
        assert_eq!(decoded.outcome, LineOutcome::Skip(SkipReason::NoContent));
        assert_eq!(decoded.completion, Some(Completion::default()));
    }

    #[test]
    fn empty_content_is_a_fragment_not_a_skip() {
        let decoded = decode_line(r#"{"message":{"content":""}}"#);
        assert_eq!(decoded.fragment(), Some(""));
    }

    #[test]
    fn blank_and_whitespace_lines_are_skipped() {
        assert_eq!(decode_line("").outcome, LineOutcome::Skip(SkipReason::Blank));
        assert_eq!(decode_line(" \t\r").outcome, LineOutcome::Skip(SkipReason::Blank));
    }

    #[test]
    fn message_without_content_is_skipped() {
        let decoded = decode_line(r#"{"message":{"role":"assistant"}}"#);
        assert_eq!(decoded.outcome, LineOutcome::Skip(SkipReason::NoContent));
    }

    #[test]
    fn non_object_json_is_malformed() {
        assert!(matches!(
            decode_line("[1,2,3]").outcome,
            LineOutcome::Skip(SkipReason::Malformed(_))
        ));
    }

    #[test]
    fn final_envelope_carries_completion_metadata() {
        let decoded = decode_line(
            r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":10,"prompt_eval_count":20,"total_duration":5000}"#,
        );
        assert_eq!(decoded.fragment(), Some(""));
        assert_eq!(
            decoded.completion,
            Some(Completion {
                done_reason: Some("stop".into()),
                eval_count: Some(10),
                prompt_eval_count: Some(20),
                total_duration: Some(5000),
            })
        );
    }

    #[test]
    fn in_stream_error_is_skipped_with_reason() {
        let decoded = decode_line(r#"{"error":"out of memory"}"#);
        assert_eq!(
            decoded.outcome,
            LineOutcome::Skip(SkipReason::UpstreamError("out of memory".into()))
        );
    }

    #[test]
    fn mistyped_metadata_does_not_cost_the_fragment() {
        let lines = [
            r#"{"message":{"content":"a"},"error":{"code":1}}"#,
            r#"{"message":{"content":"a"},"eval_count":-1}"#,
            r#"{"message":{"content":"a"},"done":"false"}"#,
            r#"{"message":{"content":"a"},"total_duration":1.5e9}"#,
        ];
        for line in lines {
            let decoded = decode_line(line);
            assert_eq!(decoded.fragment(), Some("a"), "line={line}");
            assert_eq!(decoded.completion, None, "line={line}");
        }

        let done = decode_line(r#"{"message":{"content":""},"done":true,"eval_count":"ten"}"#);
        assert_eq!(done.completion, Some(Completion::default()));
    }

    #[test]
    fn non_string_content_is_no_content() {
        assert_eq!(
            decode_line(r#"{"message":{"content":42}}"#).outcome,
            LineOutcome::Skip(SkipReason::NoContent)
        );
        assert_eq!(
            decode_line(r#"{"message":"hi"}"#).outcome,
            LineOutcome::Skip(SkipReason::NoContent)
        );
    }

    #[test]
    fn carriage_return_before_delimiter_is_tolerated() {
        assert_eq!(decode_line("{\"message\":{\"content\":\"x\"}}\r").fragment(), Some("x"));
    }
}
