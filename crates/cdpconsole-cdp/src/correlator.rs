//! Request/response correlation.
//!
//! A single actor task owns the pending-request map. Everything else talks to
//! it through its mailbox:
//!
//! 1. `send` allocates an id and registers the request *before* the command is
//!    written, so a reply can never overtake its registration
//! 2. the receive task hands every incoming frame to `route`
//! 3. the actor resolves each request once: by matching reply, by deadline,
//!    or with a cancellation at shutdown
//!
//! Frames that do not resolve a request are forwarded, in arrival order, to
//! the event queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CdpError;
use crate::protocol::{CdpErrorResponse, CdpRequest};
use crate::transport::FrameSink;

type Outcome = Result<Value, CdpError>;

/// Request waiting for its reply.
struct PendingRequest {
    method: String,
    created_at: Instant,
    deadline: Instant,
    tx: oneshot::Sender<Outcome>,
}

enum Command {
    Register { id: u64, request: PendingRequest },
    Forget { id: u64 },
    Frame(Value),
    Shutdown,
}

struct Inner {
    next_id: AtomicU64,
    mailbox: mpsc::UnboundedSender<Command>,
    sink: Arc<dyn FrameSink>,
    alive: CancellationToken,
}

/// Handle to the correlation actor. Cheap to clone.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    /// Spawn the actor. Unmatched frames go to `events`.
    pub fn spawn(
        sink: Arc<dyn FrameSink>,
        events: mpsc::UnboundedSender<Value>,
    ) -> (Self, JoinHandle<()>) {
        let (mailbox, commands) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_actor(commands, events));
        let correlator = Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                mailbox,
                sink,
                alive: CancellationToken::new(),
            }),
        };
        (correlator, task)
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.alive.is_cancelled()
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        self.inner.alive.cancelled().await
    }

    /// Send a command and wait for its reply.
    ///
    /// Resolves with the reply's `result`, a protocol error, a timeout, or
    /// [`CdpError::Cancelled`] when the session closes first.
    pub async fn send(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        if self.is_closed() {
            return Err(CdpError::Cancelled);
        }

        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let request = PendingRequest {
            method: method.to_string(),
            created_at: now,
            deadline: now + timeout,
            tx,
        };
        self.inner
            .mailbox
            .send(Command::Register { id, request })
            .map_err(|_| CdpError::Cancelled)?;

        if let Err(e) = self.write(id, method, params).await {
            let _ = self.inner.mailbox.send(Command::Forget { id });
            return Err(e);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CdpError::Cancelled),
        }
    }

    /// Send a command without tracking its reply. Returns the id used.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<u64, CdpError> {
        if self.is_closed() {
            return Err(CdpError::Cancelled);
        }
        let id = self.next_id();
        self.write(id, method, params).await?;
        Ok(id)
    }

    async fn write(&self, id: u64, method: &str, params: Option<Value>) -> Result<(), CdpError> {
        let json = serde_json::to_string(&CdpRequest { id, method, params })?;
        self.inner.sink.send(json).await?;
        Ok(())
    }

    /// Hand an incoming frame to the actor.
    pub fn route(&self, frame: Value) {
        if self.inner.mailbox.send(Command::Frame(frame)).is_err() {
            debug!("Correlator stopped; dropping frame");
        }
    }

    /// Close the session: refuse further sends and cancel everything pending.
    ///
    /// Frames already routed are still processed before the actor stops.
    pub fn shutdown(&self) {
        if !self.inner.alive.is_cancelled() {
            self.inner.alive.cancel();
            let _ = self.inner.mailbox.send(Command::Shutdown);
        }
    }
}

async fn run_actor(mut commands: mpsc::UnboundedReceiver<Command>, events: mpsc::UnboundedSender<Value>) {
    let mut pending: HashMap<u64, PendingRequest> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Register { id, request }) => {
                    trace!("Tracking request {} ({})", id, request.method);
                    pending.insert(id, request);
                }
                Some(Command::Forget { id }) => {
                    pending.remove(&id);
                }
                Some(Command::Frame(frame)) => route_frame(&mut pending, &events, frame),
                Some(Command::Shutdown) | None => break,
            },
            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                expire(&mut pending, Instant::now());
            }
        }
    }

    commands.close();
    while let Ok(command) = commands.try_recv() {
        if let Command::Register { request, .. } = command {
            let _ = request.tx.send(Err(CdpError::Cancelled));
        }
    }
    if !pending.is_empty() {
        debug!("Cancelling {} pending request(s)", pending.len());
    }
    for (_, request) in pending.drain() {
        let _ = request.tx.send(Err(CdpError::Cancelled));
    }
}

fn route_frame(
    pending: &mut HashMap<u64, PendingRequest>,
    events: &mpsc::UnboundedSender<Value>,
    frame: Value,
) {
    let matched = frame
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| pending.remove(&id).map(|request| (id, request)));

    if let Some((id, request)) = matched {
        trace!(
            "Request {} ({}) answered after {:?}",
            id,
            request.method,
            request.created_at.elapsed()
        );
        let _ = request.tx.send(reply_outcome(frame));
        return;
    }

    if events.send(frame).is_err() {
        debug!("Event queue closed; dropping frame");
    }
}

fn reply_outcome(mut frame: Value) -> Outcome {
    if let Some(error) = frame.get_mut("error").map(Value::take) {
        return Err(match serde_json::from_value::<CdpErrorResponse>(error.clone()) {
            Ok(err) => CdpError::Protocol {
                code: err.code,
                message: err.message,
            },
            Err(_) => CdpError::Protocol {
                code: 0,
                message: error.to_string(),
            },
        });
    }
    Ok(frame
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

fn expire(pending: &mut HashMap<u64, PendingRequest>, now: Instant) {
    let overdue: Vec<u64> = pending
        .iter()
        .filter(|(_, request)| request.deadline <= now)
        .map(|(id, _)| *id)
        .collect();

    for id in overdue {
        if let Some(request) = pending.remove(&id) {
            warn!(
                "Request {} ({}) timed out after {:?}",
                id,
                request.method,
                now - request.created_at
            );
            let _ = request
                .tx
                .send(Err(CdpError::Timeout(format!("Request {} timed out", request.method))));
        }
    }
}

#[cfg(test)]
#[path = "correlator_tests.rs"]
mod tests;
