//! # Stream Session Manager
//!
//! Owns one in-flight streaming run: opens the chunked request, pumps
//! chunks through the frame parser and the reducer, publishes every
//! resulting state wholesale on a watch channel, and fires the terminal
//! callbacks exactly once. Cancellation is cooperative through a token
//! checked ahead of every chunk read.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ResearchRequest};
use crate::error::LabError;

use super::event::StreamEvent;
use super::reducer::reduce;
use super::sse::FrameParser;
use super::state::SessionState;

type CompleteFn = Box<dyn FnOnce(String, Option<String>) + Send>;
type ErrorFn = Box<dyn FnOnce(String) + Send>;

/// Terminal notifications for one run. Each fires at most once; an
/// explicit cancellation fires neither.
#[derive(Default)]
pub struct SessionCallbacks {
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the final report text and the optional saved-report
    /// identifier when a `complete` event carrying a report arrives.
    pub fn on_complete(mut self, f: impl FnOnce(String, Option<String>) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called with the terminal error text on a server `error` event or a
    /// transport failure.
    pub fn on_error(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

struct ActiveSession {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Lifecycle owner for streaming research runs. One run at a time; the
/// exposed state snapshot is replaced wholesale on every event, so
/// concurrent readers never observe a partial update.
pub struct StreamSessionManager {
    api: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
    active: Option<ActiveSession>,
}

impl StreamSessionManager {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::seeded());
        Self {
            api,
            state: Arc::new(state),
            active: None,
        }
    }

    /// Subscribe to state snapshots. Each published value is a complete
    /// state; receivers only ever see whole transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming
    }

    /// Begin a run. Rejects an empty topic and refuses to open a second
    /// concurrent connection while a run is still in flight. On success
    /// the state has been re-seeded with the streaming flag up and the
    /// pump task is running.
    pub fn start(
        &mut self,
        request: ResearchRequest,
        callbacks: SessionCallbacks,
    ) -> Result<(), LabError> {
        if request.topic.trim().is_empty() {
            return Err(LabError::EmptyTopic);
        }
        if self.is_streaming() {
            return Err(LabError::SessionBusy);
        }

        let mut seeded = SessionState::seeded();
        seeded.is_streaming = true;
        self.state.send_replace(seeded);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            self.api.clone(),
            request,
            Arc::clone(&self.state),
            cancel.clone(),
            callbacks,
        ));
        self.active = Some(ActiveSession {
            cancel,
            _task: task,
        });
        Ok(())
    }

    /// Explicitly stop the current run. Aborts the transport, marks the
    /// session non-streaming, and fires no callbacks.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
        self.state.send_modify(|s| s.is_streaming = false);
    }
}

impl Drop for StreamSessionManager {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

async fn run_session(
    api: ApiClient,
    request: ResearchRequest,
    state: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
    mut callbacks: SessionCallbacks,
) {
    tracing::info!(topic = %request.topic, "opening research stream");
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            state.send_modify(|s| s.is_streaming = false);
            return;
        }
        res = api.research_stream(&request) => match res {
            Ok(response) => response,
            Err(e) => {
                fail(&state, &mut callbacks, format!("failed to open research stream: {e}"));
                return;
            }
        },
    };

    pump_stream(response.bytes_stream(), &state, &cancel, &mut callbacks).await;
}

/// Drain the chunk stream into state transitions until the transport ends,
/// fails, or the run is cancelled.
async fn pump_stream<S, B, E>(
    chunks: S,
    state: &watch::Sender<SessionState>,
    cancel: &CancellationToken,
    callbacks: &mut SessionCallbacks,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    tokio::pin!(chunks);
    let mut parser = FrameParser::new();
    let mut saw_terminal = false;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("session cancelled, dropping stream");
                state.send_modify(|s| s.is_streaming = false);
                return;
            }
            chunk = chunks.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for event in parser.push(bytes.as_ref()) {
                    dispatch(state, &event, callbacks);
                    saw_terminal |= event.is_terminal();
                }
            }
            Some(Err(e)) => {
                if saw_terminal {
                    // the run already ended from the server's point of view
                    tracing::debug!(error = %e, "transport error after terminal event");
                    state.send_modify(|s| s.is_streaming = false);
                } else {
                    fail(state, callbacks, format!("stream read failed: {e}"));
                }
                return;
            }
            None => break,
        }
    }

    parser.finish();
    // Natural end of transport. If no terminal event was seen the run just
    // stops; no success is synthesized.
    state.send_modify(|s| s.is_streaming = false);
}

fn dispatch(
    state: &watch::Sender<SessionState>,
    event: &StreamEvent,
    callbacks: &mut SessionCallbacks,
) {
    let next = reduce(&state.borrow(), event);
    state.send_replace(next);

    match event {
        StreamEvent::Complete {
            report: Some(report),
            saved_filename,
            ..
        } => {
            if let Some(cb) = callbacks.on_complete.take() {
                cb(report.clone(), saved_filename.clone());
            }
        }
        StreamEvent::Error { message, error, .. } => {
            if let Some(cb) = callbacks.on_error.take() {
                cb(error.clone().unwrap_or_else(|| message.clone()));
            }
        }
        _ => {}
    }
}

fn fail(state: &watch::Sender<SessionState>, callbacks: &mut SessionCallbacks, message: String) {
    tracing::error!(error = %message, "research stream failed");
    state.send_modify(|s| {
        s.is_streaming = false;
        s.error = Some(message.clone());
    });
    if let Some(cb) = callbacks.on_error.take() {
        cb(message);
    }
}
