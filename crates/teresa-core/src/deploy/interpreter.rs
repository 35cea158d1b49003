//! Classifies deploy stream lines and decides the terminal outcome.
//!
//! The server interleaves human-readable progress with two sentinel
//! markers. A marker may sit anywhere inside a line; it is removed before
//! the line is shown. An error marker always wins over a success marker,
//! both within a single line and across the whole stream.

use super::sink::ProgressSink;

/// Emitted by the server once the deployment has completed.
pub const SUCCESS_MARKER: &str = "----------deployment-success----------";

/// Emitted by the server when the deployment failed.
pub const ERROR_MARKER: &str = "----------deployment-error----------";

const GENERIC_FAILURE: &str = "deploy failed";

/// One line of server output, with markers already removed from the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentEvent {
    Progress(String),
    Success(String),
    Error(String),
}

impl DeploymentEvent {
    /// Text to show the user, if any.
    ///
    /// Progress lines are shown verbatim. A marker line with nothing but
    /// whitespace around the marker is omitted.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Self::Progress(text) => Some(text),
            Self::Success(rest) | Self::Error(rest) => {
                if rest.trim().is_empty() {
                    None
                } else {
                    Some(rest)
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Classify a single line. The result depends on nothing but the line.
pub fn classify_line(line: &str) -> DeploymentEvent {
    let has_error = line.contains(ERROR_MARKER);
    let has_success = line.contains(SUCCESS_MARKER);
    if !has_error && !has_success {
        return DeploymentEvent::Progress(line.to_string());
    }

    let rest = line.replace(ERROR_MARKER, "").replace(SUCCESS_MARKER, "");
    if has_error {
        DeploymentEvent::Error(rest)
    } else {
        DeploymentEvent::Success(rest)
    }
}

/// Why a stream produced no terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncompleteCause {
    /// The server closed the response without sending a marker.
    StreamEndedWithoutTerminalMarker,
    /// The per-invocation deadline expired.
    TimedOut,
    /// The transport failed mid-stream.
    Interrupted(String),
}

/// The single terminal value of a deploy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Succeeded,
    Failed { reason: String },
    Incomplete(IncompleteCause),
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Succeeded,
    Failed(String),
}

/// Per-invocation interpreter state.
#[derive(Debug, Default)]
pub struct Interpreter {
    displayed: Vec<String>,
    terminal: Option<Terminal>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a line, forward its display text to the sink, and record any
    /// terminal status. A recorded failure is never replaced.
    pub fn observe(&mut self, line: &str, sink: &dyn ProgressSink) -> DeploymentEvent {
        let event = classify_line(line);

        if let Some(text) = event.display_text() {
            sink.line(text);
            self.displayed.push(text.to_string());
        }

        match &event {
            DeploymentEvent::Error(rest) => {
                if !matches!(self.terminal, Some(Terminal::Failed(_))) {
                    let reason = match rest.trim() {
                        "" => GENERIC_FAILURE.to_string(),
                        text => text.to_string(),
                    };
                    self.terminal = Some(Terminal::Failed(reason));
                }
            }
            DeploymentEvent::Success(_) => {
                if self.terminal.is_none() {
                    self.terminal = Some(Terminal::Succeeded);
                }
            }
            DeploymentEvent::Progress(_) => {}
        }

        event
    }

    /// Whether a marker has been seen.
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Lines shown so far.
    pub fn displayed(&self) -> &[String] {
        &self.displayed
    }

    /// Close the interpreter. `cause` only matters when no marker was seen.
    pub fn finish(self, cause: IncompleteCause) -> (DeploymentOutcome, Vec<String>) {
        let outcome = match self.terminal {
            Some(Terminal::Succeeded) => DeploymentOutcome::Succeeded,
            Some(Terminal::Failed(reason)) => DeploymentOutcome::Failed { reason },
            None => DeploymentOutcome::Incomplete(cause),
        };
        (outcome, self.displayed)
    }
}
