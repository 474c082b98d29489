use crate::error::ProbeError;
use crate::harness::config::HarnessConfig;
use crate::harness::seam::{parse_events, SeamEvent};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Adapter source run inside the child interpreter.
pub const SHIM_SOURCE: &str = include_str!("shim.py");

const MAX_STDERR_DETAIL: usize = 4096;
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// How the child interpreter ended.
#[derive(Debug)]
pub enum RunOutput {
    Exited {
        exit_code: Option<i32>,
        events: Vec<SeamEvent>,
        stderr: String,
    },
    TimedOut,
}

pub struct ScriptRunner {
    config: HarnessConfig,
}

impl ScriptRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Runs `script` as `__main__` in a fresh interpreter with the adapter
    /// installed. The child is killed if it outlives the configured timeout.
    pub async fn run(&self, script: &Path) -> Result<RunOutput, ProbeError> {
        // Private event channel for this invocation only
        let channel_dir = tempfile::Builder::new()
            .prefix("flagprobe-")
            .tempdir()?;
        let events_path = channel_dir.path().join("events.jsonl");

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg("-c")
            .arg(SHIM_SOURCE)
            .arg(&events_path)
            .arg(script)
            .args(&self.config.synthetic_args)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.config.env_vars {
            command.env(key, value);
        }

        if let Some(ref cwd) = self.config.working_dir {
            command.current_dir(cwd);
        }

        tracing::debug!(
            interpreter = %self.config.interpreter,
            script = %script.display(),
            args = ?self.config.synthetic_args,
            "loading script"
        );

        // Own process group so background processes the script starts are
        // torn down with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProbeError::InterpreterNotFound {
                command: self.config.interpreter.clone(),
            },
            _ => ProbeError::IoError(e),
        })?;
        let group = child.id();

        let mut stderr_pipe = child.stderr.take();
        let mut stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        // Waits for the interpreter only; a grandchild holding stderr open
        // doesn't keep the invocation alive
        let status = match timeout(self.config.timeout(), child.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    script = %script.display(),
                    timeout_seconds = self.config.timeout_seconds,
                    "script timed out - terminating"
                );
                kill_group(group);
                let _ = child.kill().await;
                stderr_task.abort();
                return Ok(RunOutput::TimedOut);
            }
        };
        kill_group(group);

        let stderr = match timeout(STDERR_GRACE, &mut stderr_task).await {
            Ok(Ok(buf)) => buf,
            Ok(Err(_)) => Vec::new(),
            Err(_) => {
                stderr_task.abort();
                Vec::new()
            }
        };

        let events = match tokio::fs::read_to_string(&events_path).await {
            Ok(channel) => parse_events(&channel),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ProbeError::IoError(e)),
        };

        Ok(RunOutput::Exited {
            exit_code: status.code(),
            events,
            stderr: stderr_tail(&stderr),
        })
    }
}

/// Kills every process left in the invocation's process group.
#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    if let Some(pgid) = group.and_then(|id| libc::pid_t::try_from(id).ok()) {
        // Fails with ESRCH once the group is empty
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.len() <= MAX_STDERR_DETAIL {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - MAX_STDERR_DETAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
