//! Console channels a module writes into.
//!
//! The bridge decodes text out of linear memory and hands it to a
//! [`HostConsole`]. Where it ends up is the embedder's choice:
//! [`TracingConsole`] forwards to `tracing`, [`RecordingConsole`] keeps
//! every line in memory.

use crate::types::Channel;
use std::sync::{Mutex, MutexGuard};

/// Sink for module console output.
pub trait HostConsole: Send + Sync {
    /// Deliver one message. For [`Channel::Alert`] an implementation may
    /// block until the message is acknowledged.
    fn emit(&self, channel: Channel, message: &str);

    fn warn(&self, message: &str) {
        self.emit(Channel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.emit(Channel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.emit(Channel::Debug, message);
    }

    fn alert(&self, message: &str) {
        self.emit(Channel::Alert, message);
    }
}

/// Forwards module output to `tracing` under the `cala::console` target.
///
/// Alerts are logged at warn level and never block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl HostConsole for TracingConsole {
    fn emit(&self, channel: Channel, message: &str) {
        match channel {
            Channel::Warn => tracing::warn!(target: "cala::console", "{}", message),
            Channel::Info => tracing::info!(target: "cala::console", "{}", message),
            Channel::Debug => tracing::debug!(target: "cala::console", "{}", message),
            Channel::Alert => tracing::warn!(target: "cala::console", alert = true, "{}", message),
        }
    }
}

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub channel: Channel,
    pub message: String,
}

/// Keeps every line in memory. Useful for tests and for embedders that
/// want to inspect what a module printed.
#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ConsoleLine>> {
        // A panic while holding the lock cannot leave a half-pushed line.
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of everything recorded so far.
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.guard().clone()
    }

    /// Messages recorded on one channel, in order.
    pub fn messages(&self, channel: Channel) -> Vec<String> {
        self.guard()
            .iter()
            .filter(|line| line.channel == channel)
            .map(|line| line.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

impl HostConsole for RecordingConsole {
    fn emit(&self, channel: Channel, message: &str) {
        self.guard().push(ConsoleLine {
            channel,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_console_keeps_order_and_channel() {
        let console = RecordingConsole::new();
        console.info("one");
        console.warn("two");
        console.info("three");
        console.alert("four");

        assert_eq!(console.len(), 4);
        assert_eq!(console.messages(Channel::Info), vec!["one", "three"]);
        assert_eq!(console.messages(Channel::Alert), vec!["four"]);
        assert_eq!(console.lines()[1].channel, Channel::Warn);
    }

    #[test]
    fn clear_empties_the_console() {
        let console = RecordingConsole::new();
        console.debug("x");
        console.clear();
        assert!(console.is_empty());
    }

    #[test]
    fn tracing_console_accepts_every_channel() {
        let console = TracingConsole;
        for channel in [Channel::Warn, Channel::Info, Channel::Debug, Channel::Alert] {
            console.emit(channel, "no subscriber installed");
        }
    }
}
