//! In-memory channel and helpers shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as frames;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::CdpError;
use crate::materializer::PropertySource;
use crate::protocol::{methods, PropertyDescriptor};
use crate::transport::{Channel, FrameSink, TransportError};

/// Records every frame the client writes.
pub(crate) struct MemorySink {
    sent: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl MemorySink {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.sent.send(text).map_err(|_| TransportError::Closed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// The debug target's side of an in-memory channel.
pub(crate) struct Peer {
    pub(crate) sink: Arc<MemorySink>,
    sent: mpsc::UnboundedReceiver<String>,
    inbound: frames::UnboundedSender<Result<String, TransportError>>,
}

impl Peer {
    /// Next command written by the client, parsed.
    pub(crate) async fn next_command(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.sent.recv())
            .await
            .expect("timed out waiting for a command")
            .expect("client side dropped");
        serde_json::from_str(&text).expect("command is JSON")
    }

    /// Whether the client wrote anything not yet consumed.
    pub(crate) fn has_pending_command(&mut self) -> bool {
        !self.sent.is_empty()
    }

    /// Deliver a frame to the client.
    pub(crate) fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    pub(crate) fn push_raw(&self, text: &str) {
        self.inbound
            .unbounded_send(Ok(text.to_string()))
            .expect("client stopped reading");
    }

    /// End the incoming frame stream, as a remote close would.
    pub(crate) fn hang_up(&self) {
        self.inbound.close_channel();
    }
}

/// A connected in-memory channel and its remote peer.
pub(crate) fn memory_channel() -> (Channel, Peer) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = frames::unbounded();
    let sink = Arc::new(MemorySink {
        sent: sent_tx,
        closed: AtomicBool::new(false),
    });
    let channel = Channel {
        sink: sink.clone(),
        frames: inbound_rx.boxed(),
    };
    let peer = Peer {
        sink,
        sent: sent_rx,
        inbound: inbound_tx,
    };
    (channel, peer)
}

/// Next output line, failing the test after five seconds.
pub(crate) async fn next_line(lines: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), lines.recv())
        .await
        .expect("timed out waiting for output")
        .expect("output closed")
}

/// How the mock answers a fetch for one object id.
#[derive(Clone)]
pub(crate) enum Answer {
    Properties(Value),
    Timeout,
    Fail(String),
}

/// Property source backed by a fixed table; records every fetch.
#[derive(Default)]
pub(crate) struct MockProperties {
    answers: HashMap<String, Answer>,
    calls: Mutex<Vec<String>>,
}

impl MockProperties {
    pub(crate) fn with(mut self, object_id: &str, answer: Answer) -> Self {
        self.answers.insert(object_id.to_string(), answer);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PropertySource for MockProperties {
    async fn get_properties(&self, object_id: &str) -> Result<Vec<PropertyDescriptor>, CdpError> {
        self.calls.lock().push(object_id.to_string());
        match self.answers.get(object_id) {
            Some(Answer::Properties(props)) => Ok(serde_json::from_value(props.clone())?),
            Some(Answer::Timeout) => Err(CdpError::Timeout(format!("Request {} timed out", methods::GET_PROPERTIES))),
            Some(Answer::Fail(message)) => Err(CdpError::Protocol {
                code: -32000,
                message: message.clone(),
            }),
            None => Err(CdpError::InvalidResponse(format!("unknown object {}", object_id))),
        }
    }
}
