//! Subprocess launcher shared by every job that replays a compiler
//! invocation or runs a standalone tool.

use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Outcome of running one subprocess to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Raw exit code, if the process terminated normally.
    pub exit_code: Option<i32>,
}

impl From<Output> for ProcessOutcome {
    fn from(output: Output) -> Self {
        ProcessOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    }
}

/// Launch `program argv` in `cwd`, capturing both standard streams.
///
/// Spawn failures (binary not found, permission denied, …) are logged
/// and reported as a non-success outcome rather than propagated as a
/// fatal error — a single unit failing to replay must never abort the
/// rest of the run.
pub async fn run(cwd: &Path, program: &str, argv: &[String]) -> ProcessOutcome {
    log::debug!("exec in {}: {} {}", cwd.display(), program, argv.join(" "));
    match Command::new(program).args(argv).current_dir(cwd).output().await {
        Ok(output) => ProcessOutcome::from(output),
        Err(e) => {
            log::warn!("failed to launch `{program}` in {}: {e}", cwd.display());
            ProcessOutcome {
                success: false,
                stdout: String::new(),
                stderr: e.to_string(),
                exit_code: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn captures_stdout_and_success() {
        let cwd = PathBuf::from(".");
        let out = run(&cwd, "echo", &["hello".to_string()]).await;
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn reports_failure_without_panicking() {
        let cwd = PathBuf::from(".");
        let out = run(&cwd, "false", &[]).await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn missing_binary_is_reported_not_fatal() {
        let cwd = PathBuf::from(".");
        let out = run(&cwd, "/no/such/binary-xyz", &[]).await;
        assert!(!out.success);
        assert!(out.exit_code.is_none());
    }
}
