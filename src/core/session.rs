//! Caller-facing side of a streamed chat request.
//!
//! A [`StreamSession`] runs at most one request at a time. Starting a new
//! request cancels the previous one and bumps the stream id; messages still
//! queued from the old request carry the old id and are dropped before they
//! reach the accumulator.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::ChatMessage;
use crate::core::accumulator::Accumulator;
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::decoder::Completion;
use crate::core::error::StreamError;

/// Progress of the current request, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// A new fragment was appended. The whole reply so far is available
    /// from [`StreamSession::text`].
    Fragment {
        text: String,
        accumulated_len: usize,
    },
    Completed {
        text: String,
        completion: Option<Completion>,
    },
    /// The request failed. `partial` is everything delivered before the
    /// failure; it is incomplete but still valid.
    Failed {
        error: StreamError,
        partial: String,
    },
}

pub struct StreamSession {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    service: ChatStreamService,
    rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    accumulator: Option<Accumulator>,
}

impl StreamSession {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let (service, rx) = ChatStreamService::new();
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            service,
            rx,
            current_stream_id: 0,
            cancel_token: None,
            accumulator: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Takes effect from the next request on.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    pub fn is_streaming(&self) -> bool {
        self.accumulator.is_some()
    }

    /// Reply text of the in-flight request so far.
    pub fn text(&self) -> &str {
        self.accumulator.as_ref().map_or("", Accumulator::as_str)
    }

    /// Stop listening to the current request, if any. Its partial text is
    /// discarded.
    pub fn cancel_current_stream(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if self.accumulator.take().is_some() {
            debug!(stream_id = self.current_stream_id, "stream superseded or cancelled");
        }
    }

    /// Send a single-prompt request. Returns its stream id.
    pub fn start_request(&mut self, prompt: impl Into<String>) -> u64 {
        self.start_with_messages(vec![ChatMessage::user(prompt)])
    }

    /// Send a request with an explicit message list.
    pub fn start_with_messages(&mut self, api_messages: Vec<ChatMessage>) -> u64 {
        self.cancel_current_stream();
        self.current_stream_id += 1;

        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        self.accumulator = Some(Accumulator::new());

        self.service.spawn_stream(StreamParams {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_messages,
            cancel_token: token,
            stream_id: self.current_stream_id,
        });
        self.current_stream_id
    }

    /// Wait for the next update of the current request.
    ///
    /// Returns `None` when no request is in flight.
    pub async fn next_update(&mut self) -> Option<StreamUpdate> {
        while self.accumulator.is_some() {
            let (message, stream_id) = self.rx.recv().await?;
            if let Some(update) = self.apply(message, stream_id) {
                return Some(update);
            }
        }
        None
    }

    /// Fold one message from the stream task into the session. Stale
    /// messages produce no update.
    pub(crate) fn apply(&mut self, message: StreamMessage, stream_id: u64) -> Option<StreamUpdate> {
        if stream_id != self.current_stream_id {
            trace!(stream_id, current = self.current_stream_id, "ignoring stale stream message");
            return None;
        }

        match message {
            StreamMessage::Fragment(text) => {
                let accumulator = self.accumulator.as_mut()?;
                accumulator.push(&text);
                Some(StreamUpdate::Fragment {
                    text,
                    accumulated_len: accumulator.len(),
                })
            }
            StreamMessage::Completed(completion) => {
                let accumulator = self.accumulator.take()?;
                self.cancel_token = None;
                debug!(
                    stream_id,
                    fragments = accumulator.fragment_count(),
                    bytes = accumulator.len(),
                    "reply complete"
                );
                Some(StreamUpdate::Completed {
                    text: accumulator.into_string(),
                    completion,
                })
            }
            StreamMessage::Error(error) => {
                let accumulator = self.accumulator.take()?;
                self.cancel_token = None;
                if !accumulator.is_empty() {
                    debug!(
                        stream_id,
                        bytes = accumulator.len(),
                        "request failed; keeping partial reply"
                    );
                }
                Some(StreamUpdate::Failed {
                    error,
                    partial: accumulator.into_string(),
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &ChatStreamService {
        &self.service
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat_stream::test_server::{serve, Reply};

    fn session(endpoint: &str) -> StreamSession {
        StreamSession::new(reqwest::Client::new(), endpoint, "gemma2:9b")
    }

    async fn run_to_end(session: &mut StreamSession) -> (Vec<String>, StreamUpdate) {
        let mut fragments = Vec::new();
        while let Some(update) = session.next_update().await {
            match update {
                StreamUpdate::Fragment { text, .. } => fragments.push(text),
                terminal => return (fragments, terminal),
            }
        }
        panic!("stream ended without a terminal update");
    }

    #[tokio::test]
    async fn accumulates_fragments_into_full_reply() {
        let (endpoint, _server) = serve(vec![Reply::Chunks(vec![
            b"{\"message\":{\"content\":\"a\"}}\nNOT_JSON\n",
            b"{\"message\":{\"content\":\"b\"}}\n{\"done\":true}\n",
        ])])
        .await;

        let mut session = session(&endpoint);
        session.start_request("hi");
        let (fragments, terminal) = run_to_end(&mut session).await;

        assert_eq!(fragments, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            terminal,
            StreamUpdate::Completed {
                text: "ab".into(),
                completion: Some(Completion::default()),
            }
        );
        assert!(!session.is_streaming());
        assert!(session.next_update().await.is_none());
    }

    #[tokio::test]
    async fn content_after_done_is_still_accumulated() {
        let (endpoint, _server) = serve(vec![Reply::Chunks(vec![
            b"{\"message\":{\"content\":\"a\"}}\n{\"done\":true,\"done_reason\":\"stop\"}\n",
            b"{\"message\":{\"content\":\"b\"}}\n",
        ])])
        .await;

        let mut session = session(&endpoint);
        session.start_request("hi");
        let (fragments, terminal) = run_to_end(&mut session).await;

        assert_eq!(fragments, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            terminal,
            StreamUpdate::Completed {
                text: "ab".into(),
                completion: Some(Completion {
                    done_reason: Some("stop".into()),
                    ..Default::default()
                }),
            }
        );
    }

    #[tokio::test]
    async fn fragment_update_tracks_accumulated_length() {
        let (endpoint, _server) = serve(vec![Reply::Chunks(vec![
            b"{\"message\":{\"content\":\"ab\"}}\n{\"message\":{\"content\":\"\"}}\n",
        ])])
        .await;

        let mut session = session(&endpoint);
        session.start_request("hi");
        assert_eq!(
            session.next_update().await,
            Some(StreamUpdate::Fragment {
                text: "ab".into(),
                accumulated_len: 2
            })
        );
        assert_eq!(session.text(), "ab");
        assert_eq!(
            session.next_update().await,
            Some(StreamUpdate::Fragment {
                text: String::new(),
                accumulated_len: 2
            })
        );
    }

    #[tokio::test]
    async fn upstream_status_fails_without_partial_text() {
        let (endpoint, _server) =
            serve(vec![Reply::Status("500 Internal Server Error", r#"{"error":"boom"}"#)]).await;

        let mut session = session(&endpoint);
        session.start_request("hi");
        let (fragments, terminal) = run_to_end(&mut session).await;

        assert!(fragments.is_empty());
        assert_eq!(
            terminal,
            StreamUpdate::Failed {
                error: StreamError::UpstreamStatus {
                    status: 500,
                    message: "boom".into(),
                },
                partial: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_text() {
        let (endpoint, _server) = serve(vec![Reply::ChunksThenAbort(vec![
            b"{\"message\":{\"content\":\"half a \"}}\n{\"message\":{\"content\":\"ans",
        ])])
        .await;

        let mut session = session(&endpoint);
        session.start_request("hi");
        let (fragments, terminal) = run_to_end(&mut session).await;

        assert_eq!(fragments, vec!["half a ".to_string()]);
        match terminal {
            StreamUpdate::Failed { error, partial } => {
                assert!(error.is_transport());
                assert_eq!(partial, "half a ");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_request_supersedes_the_old_one() {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel();
        let (endpoint, _server) = serve(vec![
            Reply::ChunksThenHold(vec![b"{\"message\":{\"content\":\"old-1\"}}\n"], release_rx),
            Reply::Chunks(vec![
                b"{\"message\":{\"content\":\"new-1\"}}\n",
                b"{\"message\":{\"content\":\"new-2\"}}\n",
            ]),
        ])
        .await;

        let mut session = session(&endpoint);
        let first = session.start_request("first");
        assert!(matches!(
            session.next_update().await,
            Some(StreamUpdate::Fragment { ref text, .. }) if text == "old-1"
        ));

        // A late message from the first request is already queued.
        session
            .service()
            .send_for_test(StreamMessage::Fragment("old-2".into()), first);

        let second = session.start_request("second");
        assert_eq!(second, first + 1);
        let _ = release_tx.send(());

        let (fragments, terminal) = run_to_end(&mut session).await;
        assert_eq!(fragments, vec!["new-1".to_string(), "new-2".to_string()]);
        assert!(matches!(
            terminal,
            StreamUpdate::Completed { ref text, .. } if text == "new-1new-2"
        ));
    }

    #[test]
    fn stale_messages_never_touch_the_accumulator() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let _guard = runtime.enter();

        let mut session = session("http://127.0.0.1:9/api/chat");
        let old = session.start_request("one");
        let current = session.start_request("two");

        assert_eq!(session.apply(StreamMessage::Fragment("stale".into()), old), None);
        assert_eq!(
            session.apply(StreamMessage::Completed(None), old),
            None,
            "stale completion must not end the current request"
        );
        assert!(session.is_streaming());

        session.apply(StreamMessage::Fragment("fresh".into()), current);
        assert_eq!(session.text(), "fresh");
    }

    #[test]
    fn cancel_without_request_is_a_no_op() {
        let mut session = session("http://127.0.0.1:9/api/chat");
        session.cancel_current_stream();
        assert!(!session.is_streaming());
        assert_eq!(session.text(), "");
        assert_eq!(session.current_stream_id(), 0);
    }
}
