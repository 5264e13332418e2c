//! External process execution
//!
//! Runs the command line of an external-process command through `sh -c`
//! and captures its standard output:
//! - Output is capped at a configurable size
//! - A hard timeout kills the child
//! - Dropping the future (engine deadline) also kills the child

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CommandError, CommandResult};

/// Capability to run a fully expanded command line
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command line and return its captured stdout
    async fn run(&self, command_line: &str) -> CommandResult<String>;
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Maximum execution time in seconds
    pub timeout_secs: u64,
    /// Maximum stdout size in bytes
    pub max_output_bytes: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_output_bytes: 64 * 1024,
        }
    }
}

/// Runs command lines with the system shell
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    config: ShellConfig,
}

impl ShellRunner {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, command_line: &str) -> CommandResult<String> {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::Process(format!("failed to spawn: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::Process("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CommandError::Process("stderr not captured".to_string()))?;
        let max_size = self.config.max_output_bytes;

        let result = tokio::time::timeout(timeout, async move {
            let (stdout, stderr) =
                tokio::join!(read_capped(stdout, max_size), read_capped(stderr, max_size / 4));
            let (stdout_buf, truncated) = stdout?;
            let (stderr_buf, _) = stderr?;
            if truncated {
                debug!("Process output truncated to {} bytes", max_size);
            }

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout_buf, stderr_buf, status))
        })
        .await;

        match result {
            Ok(Ok((stdout_buf, stderr_buf, status))) => {
                debug!(
                    "Process finished in {}ms with {:?}",
                    start.elapsed().as_millis(),
                    status.code()
                );
                if status.success() {
                    let stdout = String::from_utf8_lossy(&stdout_buf);
                    Ok(stdout.trim_end().to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&stderr_buf).trim().to_string();
                    Err(CommandError::Process(if stderr.is_empty() {
                        format!("exited with {}", status)
                    } else {
                        stderr
                    }))
                }
            }
            Ok(Err(e)) => Err(CommandError::Process(e.to_string())),
            Err(_) => {
                // The child was moved into the timed-out future and is killed on drop
                warn!("Process timed out after {}s", self.config.timeout_secs);
                Err(CommandError::Process(format!(
                    "timed out after {} seconds",
                    self.config.timeout_secs
                )))
            }
        }
    }
}

/// Read `reader` to EOF, keeping at most `limit` bytes
///
/// The rest is drained and discarded so the child never sees a closed pipe.
async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..n.min(room)]);
        truncated |= n > room;
    }
    Ok((kept, truncated))
}
