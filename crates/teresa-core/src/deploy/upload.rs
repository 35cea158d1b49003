//! Draining the deploy response under a deadline.

use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::interpreter::{DeploymentOutcome, IncompleteCause, Interpreter};
use super::lines::LineBuffer;
use super::request::ResponseStream;
use super::sink::ProgressSink;

/// Everything observed on one response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub outcome: DeploymentOutcome,
    pub displayed: Vec<String>,
    pub bytes_received: u64,
}

/// Read the stream to its end, forwarding each completed line to `sink`.
///
/// The stream is drained even after a terminal marker so trailing output
/// still reaches the user. Reading stops at `deadline`.
pub async fn consume_stream(
    mut stream: ResponseStream,
    deadline: Instant,
    sink: &dyn ProgressSink,
) -> StreamSummary {
    let mut lines = LineBuffer::new();
    let mut interpreter = Interpreter::new();
    let mut bytes_received = 0u64;

    let cause = loop {
        match timeout_at(deadline, stream.next()).await {
            Err(_) => break IncompleteCause::TimedOut,
            Ok(None) => break IncompleteCause::StreamEndedWithoutTerminalMarker,
            Ok(Some(Err(e))) => break IncompleteCause::Interrupted(e.to_string()),
            Ok(Some(Ok(chunk))) => {
                bytes_received += chunk.len() as u64;
                for line in lines.push(&chunk) {
                    interpreter.observe(&line, sink);
                }
            }
        }
    };
    drop(stream);

    if let Some(line) = lines.finish() {
        interpreter.observe(&line, sink);
    }

    if interpreter.is_terminal() && cause != IncompleteCause::StreamEndedWithoutTerminalMarker {
        warn!(
            cause = ?cause,
            "deploy stream closed abnormally after the terminal status was received"
        );
    }

    let (outcome, displayed) = interpreter.finish(cause);
    debug!(
        outcome = ?outcome,
        lines = displayed.len(),
        bytes_received,
        "deploy stream finished"
    );

    StreamSummary {
        outcome,
        displayed,
        bytes_received,
    }
}
