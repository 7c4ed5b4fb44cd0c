use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tracing::{info, trace, warn};

use super::process::ProcessRole;

/// What a single worker output line means to an operator. Workers log far
/// more than is worth surfacing; only the high-signal classes are kept at
/// an operator-visible level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    Startup,
    Listening,
    SyncProgress,
    WorkerError,
    Noise,
}

pub fn classify(line: &str) -> OutputClass {
    let lowered = line.to_lowercase();

    if lowered.contains("error") || lowered.contains("fatal") || lowered.contains("panic") {
        OutputClass::WorkerError
    } else if lowered.contains("listening on") || lowered.contains("served from") {
        OutputClass::Listening
    } else if lowered.contains("sync") || lowered.contains("historical") {
        OutputClass::SyncProgress
    } else if lowered.contains("starting") || lowered.contains("started") {
        OutputClass::Startup
    } else {
        OutputClass::Noise
    }
}

pub(crate) fn stream_output(
    role: ProcessRole,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) {
    if let Some(stdout) = stdout {
        tokio::spawn(forward_lines(role, stdout));
    }
    if let Some(stderr) = stderr {
        tokio::spawn(forward_lines(role, stderr));
    }
}

async fn forward_lines<S: AsyncRead + Unpin>(role: ProcessRole, stream: S) {
    let mut lines = BufReader::new(stream).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match classify(&line) {
            OutputClass::WorkerError => warn!(worker = %role, "{line}"),
            OutputClass::Startup | OutputClass::Listening | OutputClass::SyncProgress => {
                info!(worker = %role, "{line}")
            }
            OutputClass::Noise => trace!(worker = %role, "{line}"),
        }
    }
}
