use async_trait::async_trait;

// ============================================================================
// PROCESS EXECUTION PORTS
// ============================================================================

/// Port for executing system processes
/// Abstracts command execution from the domain logic
#[async_trait]
pub trait ProcessExecutor {
    /// Execute command and wait for completion, honoring `options.timeout`
    async fn execute_command(
        &self,
        command: &str,
        args: &[String],
        options: &ExecutionOptions,
    ) -> crate::Result<ProcessResult>;
}

/// Port for system information
pub trait SystemInfo {
    /// Check if the current process already runs with administrative rights
    fn has_admin_privileges(&self) -> bool;
}

// ============================================================================
// SUPPORTING TYPES
// ============================================================================

/// Options for process execution
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    pub timeout: Option<std::time::Duration>,
    pub capture_output: bool,
    pub hide_window: bool,
}

/// Result of completed process execution
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time: std::time::Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            capture_output: true,
            hide_window: true,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best diagnostic text for a failed run: stderr, else stdout, else the code.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            format!("Exit {}", self.exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(code: i32, stdout: &str, stderr: &str) -> ProcessResult {
        ProcessResult {
            command: "powershell.exe".to_string(),
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            execution_time: std::time::Duration::from_millis(5),
        }
    }

    #[test]
    fn test_diagnostics_prefers_stderr() {
        assert_eq!(result(1, "out", "boom\n").diagnostics(), "boom");
        assert_eq!(result(1, " out ", "").diagnostics(), "out");
        assert_eq!(result(3, "", "").diagnostics(), "Exit 3");
        assert!(result(0, "", "").success());
    }
}
