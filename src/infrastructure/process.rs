use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::domain::ports::process::*;
use crate::error::PoserError;

// ============================================================================
// PROCESS EXECUTOR IMPLEMENTATION
// ============================================================================

/// Concrete implementation using tokio process execution
pub struct TokioProcessExecutor;

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn execute_command(
        &self,
        command: &str,
        args: &[String],
        options: &ExecutionOptions,
    ) -> crate::Result<ProcessResult> {
        let mut cmd = AsyncCommand::new(command);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        // a timed-out child is killed when its future is dropped
        cmd.kill_on_drop(true);

        if options.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            if options.hide_window {
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }

        let started = std::time::Instant::now();
        let child = cmd.spawn().map_err(|e| {
            PoserError::ExternalAgentFailure(format!("Failed to launch {}: {}", command, e))
        })?;

        let waited = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    PoserError::ExternalAgentFailure(format!(
                        "{} timed out after {}s",
                        command,
                        limit.as_secs()
                    ))
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| {
            PoserError::ExternalAgentFailure(format!("{} process error: {}", command, e))
        })?;

        let result = ProcessResult {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            execution_time: started.elapsed(),
        };

        debug!(
            command,
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "process finished"
        );

        Ok(result)
    }
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

// ============================================================================
// SYSTEM INFO IMPLEMENTATION
// ============================================================================

/// Concrete implementation for system information.
///
/// Privileges are checked once at construction; the Windows check spawns a
/// process and must not run per agent request.
pub struct StandardSystemInfo {
    is_admin: bool,
}

impl SystemInfo for StandardSystemInfo {
    fn has_admin_privileges(&self) -> bool {
        self.is_admin
    }
}

impl StandardSystemInfo {
    pub fn new() -> Self {
        let is_admin = detect_admin();
        debug!(is_admin, "privilege level detected");
        Self { is_admin }
    }
}

fn detect_admin() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(windows)]
    {
        // `net session` only succeeds from an elevated token
        std::process::Command::new("net")
            .arg("session")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

// ============================================================================
// DEFAULT IMPLEMENTATIONS
// ============================================================================

impl Default for TokioProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for StandardSystemInfo {
    fn default() -> Self {
        Self::new()
    }
}
