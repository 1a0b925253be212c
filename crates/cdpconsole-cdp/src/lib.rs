//! Console streaming over the Chrome DevTools Protocol.
//!
//! Connects to a debug target's WebSocket endpoint, enables the `Runtime`,
//! `Console` and `Log` domains, and prints every console call, uncaught
//! exception and log entry as plain text lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    WebSocket     ┌──────────────────┐
//! │   cdpconsole    │ ◄──────────────► │   Debug target   │
//! │  (this crate)   │       CDP        │ (browser / node) │
//! └─────────────────┘                  └──────────────────┘
//! ```
//!
//! Object arguments that arrive as bare handles are expanded with
//! `Runtime.getProperties` up to a bounded depth; see [`materializer`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let session = Session::connect(
//!     "ws://127.0.0.1:9229/abc",
//!     &SessionOptions::default(),
//!     Box::new(StdoutSink),
//! )
//! .await?;
//! let end = session.run().await?;
//! ```

pub mod correlator;
pub mod dispatcher;
mod error;
pub mod format;
pub mod materializer;
pub mod output;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use correlator::Correlator;
pub use dispatcher::Dispatcher;
pub use error::CdpError;
pub use format::{ArgFormatter, FormattedArg};
pub use materializer::{Materializer, PrintableNode, PropertySource, RemoteProperties};
pub use output::{LineSink, StdoutSink};
pub use session::{Session, SessionEnd, SessionHandle, SessionOptions};
pub use transport::{connect, Channel, FrameSink, TransportError};
