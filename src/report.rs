//! Where assertion outcomes go.
//!
//! The helpers never decide how a test run records results; they call a
//! [`Reporter`]. [`LogReporter`] forwards to the `log` facade, and
//! [`RecordingReporter`] keeps outcomes in memory for inspection.

/// Receives pass/fail outcomes and free-form diagnostics.
pub trait Reporter {
    /// An expectation held.
    fn passed(&mut self, message: &str);
    /// An expectation failed. Execution continues.
    fn failed(&mut self, message: &str);
    /// Diagnostic text with no pass/fail meaning.
    fn debug(&mut self, message: &str);
}

/// Reports through the `log` crate: passes at `info`, failures at `error`,
/// diagnostics at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn passed(&mut self, message: &str) {
        log::info!("PASS {message}");
    }

    fn failed(&mut self, message: &str) {
        log::error!("FAIL {message}");
    }

    fn debug(&mut self, message: &str) {
        log::debug!("{message}");
    }
}

/// One reported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// From [`Reporter::passed`].
    Passed(String),
    /// From [`Reporter::failed`].
    Failed(String),
    /// From [`Reporter::debug`].
    Debug(String),
}

/// Stores every event in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    /// Events in the order they were reported.
    pub outcomes: Vec<Outcome>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of all passes.
    pub fn passes(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Passed(m) => Some(m.as_str()),
            _ => None,
        })
    }

    /// Messages of all failures.
    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Failed(m) => Some(m.as_str()),
            _ => None,
        })
    }

    /// Messages of all diagnostics.
    pub fn debugs(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Debug(m) => Some(m.as_str()),
            _ => None,
        })
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.outcomes.clear();
    }
}

impl Reporter for RecordingReporter {
    fn passed(&mut self, message: &str) {
        self.outcomes.push(Outcome::Passed(message.to_owned()));
    }

    fn failed(&mut self, message: &str) {
        self.outcomes.push(Outcome::Failed(message.to_owned()));
    }

    fn debug(&mut self, message: &str) {
        self.outcomes.push(Outcome::Debug(message.to_owned()));
    }
}
