//! Bridge to an external dev-log sink.
//!
//! The evaluator never owns a sink; it forwards through this narrow
//! interface when a handle is present in the environment and drops the
//! message otherwise. Sinks are responsible for their own thread-safety.

/// A dev-log sink.
pub trait DevLog {
    /// Emits one log line.
    fn emit(&self, level: &str, message: &str);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDevLog;

impl DevLog for NoopDevLog {
    fn emit(&self, _level: &str, _message: &str) {}
}
