//! Event dispatch and console line formatting.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::format::{ArgFormatter, FormattedArg};
use crate::protocol::{ConsoleApiCalled, ExceptionThrown, Incoming, LogEntry};

/// Prefix of the diagnostic line printed for an event that could not be handled.
pub const DIAGNOSTIC_PREFIX: &str = "[parse-error]";

/// Indentation of each line of a complex argument block.
const BLOCK_INDENT: &str = "    ";

/// Turns unmatched frames into output lines.
pub struct Dispatcher {
    formatter: ArgFormatter,
}

impl Dispatcher {
    pub fn new(formatter: ArgFormatter) -> Self {
        Self { formatter }
    }

    /// Handle one frame. Never fails: a frame that cannot be handled yields a
    /// single diagnostic line.
    pub async fn dispatch(&self, frame: Value) -> Vec<String> {
        match Incoming::classify(frame) {
            Ok(incoming) => self.handle(incoming).await,
            Err(e) => {
                warn!("Failed to handle CDP event: {}", e);
                vec![format!("{} {}", DIAGNOSTIC_PREFIX, e)]
            }
        }
    }

    pub async fn handle(&self, incoming: Incoming) -> Vec<String> {
        match incoming {
            Incoming::ConsoleCall(call) => self.console_call(&call).await,
            Incoming::Exception(thrown) => vec![exception_line(&thrown)],
            Incoming::LogEntry(added) => log_line(&added.entry).into_iter().collect(),
            Incoming::OrphanReply { id } => {
                debug!("Ignoring reply to untracked request {}", id);
                Vec::new()
            }
            Incoming::Unknown { method } => {
                trace!("Ignoring event {}", method);
                Vec::new()
            }
        }
    }

    async fn console_call(&self, call: &ConsoleApiCalled) -> Vec<String> {
        if call.args.is_empty() {
            return Vec::new();
        }
        let formatted = join_all(call.args.iter().map(|arg| self.formatter.format(arg))).await;
        console_lines(&call.kind, formatted)
    }
}

/// Simple parts joined on the `[console.<kind>]` line, complex blocks below it.
fn console_lines(kind: &str, formatted: Vec<FormattedArg>) -> Vec<String> {
    let (complex, simple): (Vec<_>, Vec<_>) = formatted.into_iter().partition(|f| f.complex);

    let main_line = simple
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut lines = vec![if main_line.is_empty() {
        format!("[console.{}]", kind)
    } else {
        format!("[console.{}] {}", kind, main_line)
    }];

    for block in complex {
        lines.extend(block.text.split('\n').map(|line| format!("{}{}", BLOCK_INDENT, line)));
    }
    lines
}

fn exception_line(thrown: &ExceptionThrown) -> String {
    format!("[console.error] EXCEPTION: {}", thrown.message())
}

fn log_line(entry: &LogEntry) -> Option<String> {
    if entry.text.is_empty() {
        return None;
    }
    Some(format!("[{}] {}", entry.level, entry.text))
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
