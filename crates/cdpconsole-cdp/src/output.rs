//! Line output.

use std::io::{self, Write};

use tokio::sync::mpsc;

/// Destination for formatted output lines.
pub trait LineSink: Send {
    /// Write one line and flush it.
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

/// Standard output, flushed after every line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

impl LineSink for mpsc::UnboundedSender<String> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.send(line.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "line receiver dropped"))
    }
}
