use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::api::{ChatMessage, ChatRequest};
use crate::core::decoder::{Completion, LineOutcome, SkipReason};
use crate::core::error::{format_api_error, StreamError};
use crate::core::ndjson::decode_stream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Fragment(String),
    /// The body closed cleanly. Carries the metadata of the last `done`
    /// envelope, if one was seen.
    Completed(Option<Completion>),
    Error(StreamError),
}

impl StreamMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamMessage::Fragment(_))
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

#[derive(Clone)]
pub struct ChatStreamService {
    tx: StreamSender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Run one request on a background task.
    ///
    /// Every message sent for it is tagged with `params.stream_id`. Unless
    /// the request is cancelled, exactly one terminal message
    /// ([`StreamMessage::Completed`] or [`StreamMessage::Error`]) follows
    /// the fragments.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            let stream_id = params.stream_id;
            tokio::select! {
                _ = run_stream(params, &tx) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled; dropping response");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(params: StreamParams, tx: &StreamSender) {
    let StreamParams {
        client,
        endpoint,
        model,
        api_messages,
        cancel_token,
        stream_id,
    } = params;

    let request = ChatRequest {
        model,
        messages: api_messages,
        stream: true,
    };

    debug!(stream_id, %endpoint, model = %request.model, "sending chat request");
    let response = match client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send((StreamMessage::Error(StreamError::transport(e)), stream_id));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let error = StreamError::UpstreamStatus {
            status: status.as_u16(),
            message: format_api_error(&error_text),
        };
        let _ = tx.send((StreamMessage::Error(error), stream_id));
        return;
    }

    let lines = decode_stream(response.bytes_stream());
    let mut lines = std::pin::pin!(lines);
    let mut completion: Option<Completion> = None;
    let mut fragments = 0usize;

    while let Some(item) = lines.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let decoded = match item {
            Ok(decoded) => decoded,
            Err(error) => {
                if cancel_token.is_cancelled() {
                    return;
                }
                warn!(stream_id, fragments, %error, "stream read failed");
                let _ = tx.send((StreamMessage::Error(error), stream_id));
                return;
            }
        };

        // `done` is advisory; keep reading until the body closes.
        if completion.is_some() && decoded.fragment().is_some() {
            debug!(stream_id, "content after done envelope");
        }
        if let Some(done) = decoded.completion {
            completion = Some(done);
        }

        match decoded.outcome {
            LineOutcome::Fragment(text) => {
                fragments += 1;
                if tx.send((StreamMessage::Fragment(text), stream_id)).is_err() {
                    // Receiver gone; nobody is listening any more.
                    return;
                }
            }
            LineOutcome::Skip(SkipReason::Malformed(reason)) => {
                trace!(stream_id, %reason, "skipping malformed line");
            }
            LineOutcome::Skip(SkipReason::UpstreamError(message)) => {
                warn!(stream_id, %message, "upstream reported an error mid-stream");
            }
            LineOutcome::Skip(SkipReason::Blank | SkipReason::NoContent) => {}
        }
    }

    if cancel_token.is_cancelled() {
        return;
    }
    debug!(stream_id, fragments, "stream finished");
    let _ = tx.send((StreamMessage::Completed(completion), stream_id));
}
