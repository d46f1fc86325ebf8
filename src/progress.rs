//! Append-only progress surface for the multi-stage upload operation.
//!
//! User-visible status is an explicit event sequence rather than one
//! mutable notice string. Committed lines are permanent; a transient
//! status line on top of them carries the
//! `(count/total)` updates of the stage currently running and is replaced on
//! every update. A [`ProgressSink`] can observe each change (the CLI installs
//! a console sink; tests read [`ProgressLog::messages`]).

/// Observer notified on every change to a [`ProgressLog`].
pub trait ProgressSink {
    /// `rendered` is the full log including the transient status line.
    fn on_update(&self, rendered: &str);
}

#[derive(Default)]
pub struct ProgressLog {
    committed: Vec<String>,
    status: Option<String>,
    sink: Option<Box<dyn ProgressSink>>,
}

impl ProgressLog {
    pub fn new() -> ProgressLog {
        ProgressLog::default()
    }

    pub fn with_sink(sink: Box<dyn ProgressSink>) -> ProgressLog {
        ProgressLog {
            sink: Some(sink),
            ..Default::default()
        }
    }

    /// Replace the transient status line.
    pub fn status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.notify();
    }

    /// Append a permanent line, clearing any transient status.
    pub fn commit(&mut self, message: impl Into<String>) {
        self.status = None;
        self.committed.push(message.into());
        self.notify();
    }

    /// The permanent lines committed so far.
    pub fn messages(&self) -> &[String] {
        &self.committed
    }

    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = self.committed.iter().map(String::as_str).collect();
        if let Some(status) = &self.status {
            lines.push(status);
        }
        lines.join("\n")
    }

    fn notify(&self) {
        if let Some(sink) = &self.sink {
            sink.on_update(&self.render());
        }
    }
}
