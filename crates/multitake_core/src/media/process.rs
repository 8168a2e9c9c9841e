//! Running external tools with a deadline.

use std::io::{self, Read};
use std::process::{Child, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::commands::MediaCommand;
use super::errors::{MediaError, MediaResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are drained on their own threads so a chatty tool never
/// blocks on a full pipe while we wait on it. A non-zero exit is returned as
/// `ToolFailed`.
pub fn run_with_timeout(command: &MediaCommand, timeout: Option<Duration>) -> MediaResult<ProcessOutput> {
    tracing::debug!("[Process] $ {}", command);

    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| MediaError::SpawnFailed {
            program: command.program.clone(),
            source,
        })?;

    let stdout_reader = child
        .stdout
        .take()
        .map(|out| thread::spawn(move || drain(out)));
    let stderr_reader = child
        .stderr
        .take()
        .map(|err| thread::spawn(move || drain(err)));

    let status = wait_with_deadline(&mut child, &command.program, timeout)?;

    let stdout = join_pipe(stdout_reader, "stdout");
    let stderr =
        join_pipe(stderr_reader, "stderr").map(|buf| String::from_utf8_lossy(&buf).into_owned());

    if !status.success() {
        return Err(MediaError::tool_failed(
            &command.program,
            status.code().unwrap_or(-1),
            stderr.as_deref().unwrap_or(""),
        ));
    }

    let stdout = stdout?;
    let stderr = stderr?;
    Ok(ProcessOutput { stdout, stderr })
}

fn drain(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Collect a pipe drained on another thread; a failed read is an error, not a short buffer.
fn join_pipe(reader: Option<JoinHandle<io::Result<Vec<u8>>>>, stream: &str) -> MediaResult<Vec<u8>> {
    let Some(handle) = reader else {
        return Ok(Vec::new());
    };
    match handle.join() {
        Ok(result) => result.map_err(|e| {
            MediaError::Io(io::Error::new(e.kind(), format!("reading {}: {}", stream, e)))
        }),
        Err(_) => Err(MediaError::Io(io::Error::other(format!(
            "{} reader panicked",
            stream
        )))),
    }
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
) -> MediaResult<std::process::ExitStatus> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            tracing::warn!(
                "[Process] {} exceeded {:.1}s, killing",
                program,
                timeout.as_secs_f64()
            );
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::Timeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> MediaCommand {
        MediaCommand::new("sh").args(["-c", script])
    }

    /// Yields a few bytes, then fails like a pipe torn down mid-read.
    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            self.sent = true;
            let n = buf.len().min(3);
            buf[..n].copy_from_slice(&b"pcm"[..n]);
            Ok(n)
        }
    }

    #[test]
    fn failed_pipe_read_is_an_io_error() {
        let handle = thread::spawn(|| drain(BrokenPipe { sent: false }));
        let err = join_pipe(Some(handle), "stdout").unwrap_err();

        assert!(matches!(&err, MediaError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(err.to_string().contains("reading stdout"));
    }

    #[test]
    fn missing_pipe_reads_as_empty() {
        assert!(join_pipe(None, "stderr").unwrap().is_empty());
    }

    #[test]
    fn captures_stdout() {
        let out = run_with_timeout(&sh("printf hello"), Some(Duration::from_secs(5))).unwrap();
        assert_eq!(out.stdout, b"hello");
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let err = run_with_timeout(&sh("echo broken >&2; exit 3"), None).unwrap_err();
        match err {
            MediaError::ToolFailed {
                exit_code, message, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(message, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slow_process_is_killed() {
        let started = Instant::now();
        let err = run_with_timeout(&sh("sleep 5"), Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, MediaError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let err = run_with_timeout(&MediaCommand::new("definitely-not-a-tool-xyz"), None).unwrap_err();
        assert!(matches!(err, MediaError::SpawnFailed { .. }));
    }
}
