use crate::models::ProcessOutcome;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// How long to keep draining pipes after the child is gone.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// A command line to run with a bounded wait.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl ProcessSpec {
    /// The command line as it would be typed, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external programs. The seam between the service and the FaceFusion
/// executable, so tests can substitute a fake program or a fake runner.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `spec` to completion or until its timeout expires, in which case
    /// the child is killed and reaped before returning. `Err` only when the
    /// process could not be started.
    async fn run(&self, spec: &ProcessSpec) -> std::io::Result<ProcessOutcome>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

#[async_trait::async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec) -> std::io::Result<ProcessOutcome> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().map(OutputCollector::spawn);
        let stderr = child.stderr.take().map(OutputCollector::spawn);

        let (return_code, timed_out) =
            match tokio::time::timeout(spec.timeout, child.wait()).await {
                Ok(status) => (exit_code(status?), false),
                Err(_) => {
                    tracing::warn!(
                        "Process timed out after {:?}, killing: {}",
                        spec.timeout,
                        spec.display()
                    );
                    if let Err(e) = child.kill().await {
                        tracing::error!("Failed to kill timed out process: {}", e);
                    }
                    (-1, true)
                }
            };

        let stdout = match stdout {
            Some(c) => c.finish().await,
            None => String::new(),
        };
        let stderr = match stderr {
            Some(c) => c.finish().await,
            None => String::new(),
        };

        Ok(ProcessOutcome {
            return_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Drains a pipe into a shared buffer so that whatever arrived before a kill
/// is still available afterwards.
struct OutputCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl OutputCollector {
    fn spawn<R>(mut reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = buffer.clone();
        let handle = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(e) => {
                        tracing::debug!("Pipe read error: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buffer, handle }
    }

    async fn finish(mut self) -> String {
        // A grandchild may still hold the pipe open; don't wait on it forever.
        if tokio::time::timeout(OUTPUT_GRACE, &mut self.handle)
            .await
            .is_err()
        {
            self.handle.abort();
        }
        let buf = self
            .buffer
            .lock()
            .map(|b| b.clone())
            .unwrap_or_else(|e| e.into_inner().clone());
        String::from_utf8_lossy(&buf).into_owned()
    }
}
