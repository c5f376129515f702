//! Captured process execution with an optional deadline.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `command` with captured output. Without a timeout this waits for exit.
///
/// Returns `Ok(None)` when the deadline passes; the child is killed.
pub fn run_captured(
    command: &mut Command,
    timeout: Option<Duration>,
) -> io::Result<Option<CapturedOutput>> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let Some(timeout) = timeout else {
        let output = command.output()?;
        return Ok(Some(CapturedOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }));
    };

    let mut child = command.spawn()?;
    // Drain both pipes while waiting so a chatty child cannot fill them and stall.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // Readers are left to finish on their own; a grandchild may
            // still hold the pipes open.
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    Ok(Some(CapturedOutput {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    }))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<String> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    let bytes = reader
        .join()
        .map_err(|_| io::Error::other("output reader panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
