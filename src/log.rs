/*!
Log sink abstraction for hardware components.

Components that report out-of-contract bus traffic (reads of locked video
memory, writes into the unusable gap, undecoded IO addresses) do so through
an injected `LogSink` rather than a process-global logger. The sink is handed
to each component at construction and cloned freely; the core is
single-threaded so a plain `Rc` is enough.

Sinks:
- `StderrSink`: prints to stderr, the default for binaries.
- `NullSink`: drops everything, the default for tests that don't inspect logs.
- `CaptureSink`: records messages for tests that assert on logged violations.
*/

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Message severity. `Error` marks out-of-contract bus traffic (non-fatal,
/// the machine keeps running); `Info` marks notable state changes such as
/// the LCD being switched off; `Debug` is free-form tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Info,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "ERROR"),
            Level::Info => write!(f, "INFO"),
            Level::Debug => write!(f, "DEBUG"),
        }
    }
}

/// Receiver for component log messages.
pub trait LogSink {
    fn log(&self, level: Level, message: fmt::Arguments<'_>);
}

/// Sink that writes every message to stderr.
#[derive(Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        eprintln!("{level:<5} | {message}");
    }
}

/// Sink that discards every message.
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _message: fmt::Arguments<'_>) {}
}

/// Sink that records formatted messages for later inspection in tests.
#[derive(Debug, Default)]
pub struct CaptureSink {
    messages: RefCell<Vec<(Level, String)>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatted messages captured so far, in arrival order.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    /// True if any captured message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages
            .borrow()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl LogSink for CaptureSink {
    fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

/// Cloneable handle components keep to their injected sink.
#[derive(Clone)]
pub struct Logger {
    sink: Rc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Rc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Handle that discards everything.
    pub fn null() -> Self {
        Self::new(Rc::new(NullSink))
    }

    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.sink.log(Level::Error, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.sink.log(Level::Info, message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.sink.log(Level::Debug, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Rc::new(StderrSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_records_messages() {
        let sink = Rc::new(CaptureSink::new());
        let log = Logger::new(sink.clone());

        log.error(format_args!("bad access at 0x{:04X}", 0xFEA0));
        log.info(format_args!("lcd off"));

        assert!(sink.contains(Level::Error, "0xFEA0"));
        assert!(sink.contains(Level::Info, "lcd off"));
        assert!(!sink.contains(Level::Debug, "lcd off"));
        assert_eq!(sink.messages().len(), 2);
    }
}
