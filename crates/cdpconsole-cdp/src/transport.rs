//! Channel adapter: a duplex stream of text frames.
//!
//! The rest of the crate only sees [`FrameSink`] for outgoing frames and a
//! [`FrameStream`] for incoming ones. [`connect`] provides both over a
//! WebSocket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, SplitSink};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::CdpError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Incoming text frames; ends when the peer closes the channel.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// Outgoing half of a channel.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Send one text frame.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the channel.
    async fn close(&self) -> Result<(), TransportError>;
}

/// An open duplex channel.
pub struct Channel {
    pub sink: Arc<dyn FrameSink>,
    pub frames: FrameStream,
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Connection closed")]
    Closed,

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            other => TransportError::WebSocket(other.to_string()),
        }
    }
}

/// WebSocket sender half.
struct WsFrameSink {
    inner: tokio::sync::Mutex<WsSink>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        trace!("CDP send: {}", text);
        let mut ws = self.inner.lock().await;
        ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut ws = self.inner.lock().await;
        match ws.close().await {
            Ok(()) => Ok(()),
            Err(e) => match TransportError::from(e) {
                TransportError::Closed => Ok(()),
                other => Err(other),
            },
        }
    }
}

/// Connect to a debug target's WebSocket URL.
///
/// Only `ws://` and `wss://` URLs are accepted. The handshake is bounded by
/// `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<Channel, CdpError> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(CdpError::ConnectionFailed(format!(
            "Unsupported scheme '{}': expected ws:// or wss://",
            parsed.scheme()
        )));
    }

    debug!("Connecting to {}", parsed);
    let (ws_stream, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
        .await
        .map_err(|_| CdpError::ConnectionFailed(TransportError::ConnectTimeout(timeout).to_string()))?
        .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

    let (ws_sink, ws_source) = ws_stream.split();
    let frames = ws_source
        .filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text.as_str());
                    Some(Ok(text.as_str().to_owned()))
                }
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame ({} bytes)", bytes.len());
                        None
                    }
                },
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            }
        })
        .boxed();

    debug!("Connected to {}", parsed);
    Ok(Channel {
        sink: Arc::new(WsFrameSink {
            inner: tokio::sync::Mutex::new(ws_sink),
        }),
        frames,
    })
}
