//! Running the task-execution collaborator with a timeout and bounded output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

const READ_CHUNK: usize = 8192;

/// One captured stream, cut off after the configured limit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    /// Bytes read from the pipe but not kept.
    pub dropped: usize,
}

impl Captured {
    /// Drain `reader` to EOF, keeping at most `limit` bytes.
    fn drain<R: Read>(mut reader: R, limit: usize) -> Result<Self> {
        let mut captured = Self::default();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut chunk).context("read output")?;
            if n == 0 {
                return Ok(captured);
            }
            let keep = n.min(limit.saturating_sub(captured.bytes.len()));
            captured.bytes.extend_from_slice(&chunk[..keep]);
            captured.dropped += n - keep;
        }
    }

    /// Lossy UTF-8 text with a `[label truncated N bytes]` marker when cut.
    pub fn text(&self, label: &str) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.dropped > 0 {
            text.push_str(&format!("\n[{label} truncated {} bytes]\n", self.dropped));
        }
        text
    }
}

/// Exit status and captured output of a finished (or killed) child.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        self.stdout.text("stdout")
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.text("stderr")
    }
}

/// Run `cmd` to completion or until `timeout`, whichever comes first.
///
/// Both pipes are drained on scoped reader threads while the child runs, so a
/// chatty task cannot block on a full pipe. At most `output_limit_bytes` of
/// each stream is kept.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), "spawning task command");
    let mut child = cmd
        .spawn()
        .inspect_err(|err| error!(err = %err, "failed to spawn task command"))
        .context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (waited, stdout, stderr) = thread::scope(|scope| {
        let out = scope.spawn(move || Captured::drain(stdout, output_limit_bytes));
        let err = scope.spawn(move || Captured::drain(stderr, output_limit_bytes));
        let waited = wait_or_kill(&mut child, timeout);
        (waited, join_reader(out, "stdout"), join_reader(err, "stderr"))
    });
    let (status, timed_out) = waited?;
    let (stdout, stderr) = (stdout?, stderr?);

    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "task output truncated"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "task command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// Wait for `child`, killing it once `timeout` elapses. Returns the final
/// status and whether the kill happened.
fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<(ExitStatus, bool)> {
    let waited = child.wait_timeout(timeout).context("wait for command");
    match waited {
        Ok(Some(status)) => Ok((status, false)),
        Ok(None) => {
            warn!(timeout_secs = timeout.as_secs(), "task command timed out, killing");
            child.kill().context("kill command")?;
            Ok((child.wait().context("wait command after kill")?, true))
        }
        Err(err) => {
            // Readers only finish once the pipes close.
            let _ = child.kill();
            let _ = child.wait();
            Err(err)
        }
    }
}

fn join_reader(
    handle: thread::ScopedJoinHandle<'_, Result<Captured>>,
    label: &str,
) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("{label} reader thread panicked"))?
        .with_context(|| format!("capture {label}"))
}
