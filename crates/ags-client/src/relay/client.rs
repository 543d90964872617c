use ags_proto::{OutgoingMessage, RelayMessage, RelayStats};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{ConnectionState, PollStage, RelayEvent};
use super::transport::RelayTransport;
use crate::error::RelayError;
use crate::identity::WorkerId;
use crate::view::{RelayUpdate, RelayView};

struct ActivePoll {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Shared {
    state: ConnectionState,
    active: Option<ActivePoll>,
}

/// Long-poll receive loop plus one-shot sends for a single worker.
///
/// At most one receive request is outstanding. Status updates are rendered
/// while the internal lock is held so they reach the view in transition
/// order; a view must therefore never call back into its `RelayClient`.
pub struct RelayClient<T: RelayTransport> {
    transport: Arc<T>,
    view: Arc<dyn RelayView>,
    worker: WorkerId,
    shared: Arc<Mutex<Shared>>,
}

impl<T: RelayTransport> RelayClient<T> {
    pub fn new(transport: Arc<T>, view: Arc<dyn RelayView>, worker: WorkerId) -> Self {
        Self {
            transport,
            view,
            worker,
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Idle,
                active: None,
            })),
        }
    }

    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Start the receive loop. Must be called inside a tokio runtime.
    pub fn connect(&self) -> Result<(), RelayError> {
        let mut shared = self.shared.lock();
        let next = shared
            .state
            .on(RelayEvent::ConnectRequested)
            .ok_or(RelayError::AlreadyConnected)?;
        shared.state = next;
        self.view.render(RelayUpdate::Status(next));

        let (cancel, cancelled) = oneshot::channel();
        let task = tokio::spawn(poll_loop(
            self.transport.clone(),
            self.view.clone(),
            self.worker.clone(),
            self.shared.clone(),
            cancelled,
        ));
        shared.active = Some(ActivePoll { cancel, task });
        info!(worker = %self.worker, "connecting to relay");
        Ok(())
    }

    /// Abort the outstanding poll and wait for the loop to stop. No-op when
    /// not connected.
    pub async fn disconnect(&self) {
        let active = {
            let mut shared = self.shared.lock();
            let Some(next) = shared.state.on(RelayEvent::DisconnectRequested) else {
                return;
            };
            shared.state = next;
            self.view.render(RelayUpdate::Status(next));
            shared.active.take()
        };

        if let Some(ActivePoll { cancel, task }) = active {
            let _ = cancel.send(());
            if let Err(err) = task.await {
                warn!(error = %err, "relay poll task ended abnormally");
            }
        }

        let mut shared = self.shared.lock();
        if let Some(next) = shared.state.on(RelayEvent::Stopped) {
            shared.state = next;
            self.view.render(RelayUpdate::Status(next));
        }
        info!(worker = %self.worker, "disconnected from relay");
    }

    /// Connect when idle, otherwise disconnect. Returns the resulting state.
    pub async fn toggle(&self) -> Result<ConnectionState, RelayError> {
        match self.state() {
            ConnectionState::Idle => self.connect()?,
            s if s.is_active() => self.disconnect().await,
            // already on its way down
            _ => {}
        }
        Ok(self.state())
    }

    /// Send `text` from this worker to a comma-separated recipient list.
    /// Independent of the receive loop.
    pub async fn send(&self, recipients: &str, text: &str) -> Result<(), RelayError> {
        let message = OutgoingMessage::with_recipient_list(self.worker.as_str(), recipients, text);
        debug!(from = %self.worker, to = ?message.to, "sending relay message");
        self.transport.send(&message).await
    }

    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let line = self.transport.stats().await?;
        Ok(RelayStats::parse(&line)?)
    }
}

impl<T: RelayTransport> Drop for RelayClient<T> {
    fn drop(&mut self) {
        if let Some(active) = self.shared.lock().active.take() {
            active.task.abort();
        }
    }
}

async fn poll_loop<T: RelayTransport>(
    transport: Arc<T>,
    view: Arc<dyn RelayView>,
    worker: WorkerId,
    shared: Arc<Mutex<Shared>>,
    mut cancelled: oneshot::Receiver<()>,
) {
    loop {
        let outcome = tokio::select! {
            biased;
            _ = &mut cancelled => {
                debug!(worker = %worker, "poll aborted");
                return;
            }
            outcome = poll_once(transport.as_ref(), view.as_ref(), &worker, &shared) => outcome,
        };

        match outcome {
            Ok(Some(message)) => {
                info!(worker = %worker, recipient = %message.recipient, "relay message received");
                view.render(RelayUpdate::Message(message));
            }
            Ok(None) => debug!(worker = %worker, "poll completed empty, reissuing"),
            Err(err) => {
                warn!(worker = %worker, error = %err, "relay poll failed");
                mark_failed(&shared, view.as_ref(), &err);
                return;
            }
        }
    }
}

async fn poll_once<T: RelayTransport>(
    transport: &T,
    view: &dyn RelayView,
    worker: &WorkerId,
    shared: &Mutex<Shared>,
) -> Result<Option<RelayMessage>, RelayError> {
    debug!(worker = %worker, stage = ?PollStage::Unsent, "poll");
    let mut body = transport.open_poll(worker).await?;
    debug!(worker = %worker, stage = ?PollStage::Opened, "poll");
    debug!(worker = %worker, stage = ?PollStage::HeadersReceived, "poll");

    let mut buf = Vec::new();
    let mut loading = false;
    while let Some(chunk) = body.chunk().await? {
        if !loading && !chunk.is_empty() {
            loading = true;
            debug!(worker = %worker, stage = ?PollStage::Loading, "poll");
            mark_connected(shared, view);
        }
        buf.extend_from_slice(&chunk);
    }

    debug!(worker = %worker, stage = ?PollStage::Done, bytes = buf.len(), "poll");
    Ok(RelayMessage::parse_body(&buf)?)
}

fn mark_connected(shared: &Mutex<Shared>, view: &dyn RelayView) {
    let mut guard = shared.lock();
    if guard.state != ConnectionState::Connecting {
        return;
    }
    if let Some(next) = guard.state.on(RelayEvent::BodyStarted) {
        guard.state = next;
        view.render(RelayUpdate::Status(next));
    }
}

fn mark_failed(shared: &Mutex<Shared>, view: &dyn RelayView, err: &RelayError) {
    let mut guard = shared.lock();
    // a pending disconnect owns the transition back to Idle
    if let Some(next) = guard.state.on(RelayEvent::PollFailed) {
        guard.state = next;
        guard.active = None;
        view.render(RelayUpdate::Failed(err.to_string()));
        view.render(RelayUpdate::Status(next));
    }
}
