//! Console session: activation handshake plus the receive and dispatch tasks.
//!
//! ```text
//!  channel ──► receive task ──► correlator actor ──► event queue ──► dispatch task ──► output
//!                                    ▲                                    │
//!                                    └──── Runtime.getProperties ◄────────┘
//! ```
//!
//! The receive task never waits on event handling, so a handler suspended on
//! a nested fetch always gets its reply routed.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesOrdered;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::error::CdpError;
use crate::format::ArgFormatter;
use crate::materializer::{Materializer, RemoteProperties, DEFAULT_MAX_DEPTH};
use crate::output::LineSink;
use crate::protocol::methods;
use crate::transport::{self, Channel, FrameSink, FrameStream, TransportError};

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// WebSocket connect timeout.
    pub connect_timeout: Duration,
    /// Timeout of each `Runtime.getProperties` fetch.
    pub fetch_timeout: Duration,
    /// Property-fetch hops per argument.
    pub max_depth: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(2),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The remote side closed the channel.
    ChannelClosed,
    /// [`SessionHandle::close`] was called.
    CloseRequested,
}

/// A running console session.
pub struct Session {
    correlator: Correlator,
    sink: Arc<dyn FrameSink>,
    receiver: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    actor: JoinHandle<()>,
}

/// Requests an explicit close from outside the session.
#[derive(Clone)]
pub struct SessionHandle {
    correlator: Correlator,
    sink: Arc<dyn FrameSink>,
}

impl SessionHandle {
    /// Mark the session closed, close the channel and cancel pending requests.
    pub async fn close(&self) {
        if self.correlator.is_closed() {
            return;
        }
        info!("Closing session");
        self.correlator.shutdown();
        if let Err(e) = self.sink.close().await {
            debug!("Error while closing channel: {}", e);
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.correlator.is_closed()
    }
}

impl Session {
    /// Connect to `url` and start a session.
    pub async fn connect(
        url: &str,
        options: &SessionOptions,
        output: Box<dyn LineSink>,
    ) -> Result<Self, CdpError> {
        let channel = transport::connect(url, options.connect_timeout).await?;
        Self::start(channel, options, output).await
    }

    /// Start a session over an already open channel.
    ///
    /// Sends the activation commands without waiting for their replies, then
    /// spawns the receive and dispatch tasks.
    pub async fn start(
        channel: Channel,
        options: &SessionOptions,
        output: Box<dyn LineSink>,
    ) -> Result<Self, CdpError> {
        let Channel { sink, frames } = channel;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (correlator, actor) = Correlator::spawn(sink.clone(), events_tx);

        for method in methods::ACTIVATION {
            if let Err(e) = correlator.notify(method, None).await {
                correlator.shutdown();
                return Err(e);
            }
        }
        debug!("Activated Runtime, Console and Log domains");

        let receiver = tokio::spawn(receive_loop(frames, correlator.clone()));

        let properties = RemoteProperties::new(correlator.clone(), options.fetch_timeout);
        let formatter = ArgFormatter::new(Materializer::new(Arc::new(properties)), options.max_depth);
        let dispatcher = tokio::spawn(dispatch_loop(Dispatcher::new(formatter), events_rx, output));

        Ok(Self {
            correlator,
            sink,
            receiver,
            dispatcher,
            actor,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            correlator: self.correlator.clone(),
            sink: self.sink.clone(),
        }
    }

    /// Run until the channel closes or a close is requested, then tear down:
    /// pending requests are cancelled and queued events are flushed.
    pub async fn run(self) -> Result<SessionEnd, CdpError> {
        let Self {
            correlator,
            sink: _,
            mut receiver,
            dispatcher,
            actor,
        } = self;

        let end = tokio::select! {
            _ = &mut receiver => SessionEnd::ChannelClosed,
            _ = correlator.closed() => SessionEnd::CloseRequested,
        };
        debug!("Session ending: {:?}", end);

        correlator.shutdown();
        if end == SessionEnd::CloseRequested {
            join(receiver, "receive").await?;
        }
        join(actor, "correlator").await?;
        join(dispatcher, "dispatch").await?;
        Ok(end)
    }
}

async fn join(task: JoinHandle<()>, name: &str) -> Result<(), CdpError> {
    task.await
        .map_err(|e| CdpError::Internal(format!("{} task failed: {}", name, e)))
}

/// Drain the channel into the correlator until it ends or the session closes.
async fn receive_loop(mut frames: FrameStream, correlator: Correlator) {
    loop {
        let next = tokio::select! {
            _ = correlator.closed() => break,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(text)) => match parse_frame(&text) {
                Some(frame) => correlator.route(frame),
                None => debug!("Dropping malformed frame ({} bytes)", text.len()),
            },
            Some(Err(TransportError::Closed)) | None => {
                debug!("Channel closed by peer");
                break;
            }
            Some(Err(e)) => {
                warn!("Channel error: {}", e);
                break;
            }
        }
    }
}

/// A frame must be a JSON object; anything else is dropped.
fn parse_frame(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Format events concurrently and emit their lines in arrival order.
async fn dispatch_loop(
    dispatcher: Dispatcher,
    mut events: mpsc::UnboundedReceiver<Value>,
    mut output: Box<dyn LineSink>,
) {
    let mut in_flight = FuturesOrdered::new();
    let mut open = true;

    loop {
        tokio::select! {
            event = events.recv(), if open => match event {
                Some(frame) => in_flight.push_back(dispatcher.dispatch(frame)),
                None => open = false,
            },
            Some(lines) = in_flight.next(), if !in_flight.is_empty() => {
                for line in lines {
                    if let Err(e) = output.emit(&line) {
                        warn!("Failed to write output: {}", e);
                    }
                }
            }
            else => break,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
