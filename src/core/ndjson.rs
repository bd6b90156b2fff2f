//! Binds a [`LineFramer`] to a fallible byte stream.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::core::decoder::{decode_line, DecodedLine};
use crate::core::error::StreamError;
use crate::core::framer::LineFramer;

struct PipelineState<S> {
    bytes: Pin<Box<S>>,
    framer: Option<LineFramer>,
    ready: VecDeque<String>,
}

/// Decode a chunked NDJSON body line by line.
///
/// The returned stream is lazy: a chunk is only pulled once every line of
/// the previous one has been consumed. The first read error is yielded as
/// [`StreamError::Transport`] and ends the stream; text after the last
/// delimiter is dropped in both the error and the end-of-body case.
pub fn decode_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<DecodedLine, StreamError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let state = PipelineState {
        bytes: Box::pin(bytes),
        framer: Some(LineFramer::new()),
        ready: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(decode_line(&line)), state));
            }

            let framer = state.framer.as_mut()?;
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.ready.extend(framer.push(chunk.as_ref()));
                }
                Some(Err(err)) => {
                    if let Some(tail) = state.framer.take().and_then(LineFramer::finish) {
                        debug!(bytes = tail.len(), "discarding partial line after read error");
                    }
                    return Some((Err(StreamError::transport(err)), state));
                }
                None => {
                    if let Some(framer) = state.framer.take() {
                        let lines = framer.lines_emitted();
                        if let Some(tail) = framer.finish() {
                            debug!(
                                bytes = tail.len(),
                                lines,
                                "body ended without trailing newline; dropping tail"
                            );
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::{LineOutcome, SkipReason};

    fn ok(bytes: &'static [u8]) -> Result<&'static [u8], &'static str> {
        Ok(bytes)
    }

    async fn collect(
        chunks: Vec<Result<&'static [u8], &'static str>>,
    ) -> Vec<Result<DecodedLine, StreamError>> {
        decode_stream(stream::iter(chunks)).collect().await
    }

    #[tokio::test]
    async fn yields_fragments_and_skips_in_order() {
        let items = collect(vec![
            ok(b"{\"message\":{\"content\":\"a\"}}\nNOT_"),
            ok(b"JSON\n{\"message\":{\"con"),
            ok(b"tent\":\"b\"}}\n{\"done\":true}\n"),
        ])
        .await;

        let outcomes: Vec<LineOutcome> = items
            .into_iter()
            .map(|item| item.expect("no transport error").outcome)
            .collect();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0], LineOutcome::Fragment("a".into()));
        assert!(matches!(outcomes[1], LineOutcome::Skip(SkipReason::Malformed(_))));
        assert_eq!(outcomes[2], LineOutcome::Fragment("b".into()));
        assert_eq!(outcomes[3], LineOutcome::Skip(SkipReason::NoContent));
    }

    #[tokio::test]
    async fn read_error_ends_stream_after_complete_lines() {
        let items = collect(vec![
            ok(b"{\"message\":{\"content\":\"kept\"}}\n{\"message\":"),
            Err("connection reset"),
            ok(b"{\"message\":{\"content\":\"never\"}}\n"),
        ])
        .await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].as_ref().map(|line| line.fragment().map(str::to_owned)),
            Ok(Some("kept".to_string()))
        );
        assert_eq!(
            items[1].as_ref().err(),
            Some(&StreamError::Transport("connection reset".into()))
        );
    }

    #[tokio::test]
    async fn unterminated_tail_is_dropped() {
        let items = collect(vec![ok(
            b"{\"message\":{\"content\":\"x\"}}\n{\"message\":{\"content\":\"y\"}}",
        )]).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn empty_body_yields_nothing() {
        assert!(collect(Vec::new()).await.is_empty());
    }
}
