/// Single decomposition attempt: spawn the solver subprocess at a fixed
/// width, capture its output, and hold a handle that lets the search
/// kill the whole process group if the deadline fires first.
use crate::config::SolverConfig;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

/// Errors that can occur while running one attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Failed to spawn the solver subprocess. Fatal: a driver that
    /// cannot launch its solver has no meaningful width to report.
    Spawn { source: std::io::Error },
    /// Failed to read solver output or collect its exit status.
    Wait { source: std::io::Error },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Spawn { source } => {
                write!(f, "failed to spawn solver subprocess: {}", source)
            }
            AttemptError::Wait { source } => {
                write!(f, "I/O error while waiting for solver: {}", source)
            }
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Spawn { source } => Some(source),
            AttemptError::Wait { source } => Some(source),
        }
    }
}

/// Build the solver arguments, substituting `{width}` and `{graph}`
/// placeholders with the attempt's actual parameters.
fn build_args(config: &SolverConfig, width: u64, graph: &Path) -> Vec<String> {
    config
        .args
        .iter()
        .map(|arg| {
            arg.replace("{width}", &width.to_string())
                .replace("{graph}", &graph.to_string_lossy())
        })
        .collect()
}

/// One in-flight solver invocation.
///
/// Each attempt carries its own width and graph path; nothing is read
/// from shared state. Exactly one attempt is live at a time.
#[derive(Debug)]
pub struct Attempt {
    /// The width this attempt was launched with.
    pub width: u64,
    child: Child,
    stdout: Option<ChildStdout>,
    pid: u32,
}

impl Attempt {
    /// Spawn the solver subprocess at `width` for `graph`.
    ///
    /// The subprocess runs in its own process group (via `process_group(0)`)
    /// so `kill` can take down the solver and anything it forked.
    pub fn spawn(config: &SolverConfig, width: u64, graph: &Path) -> Result<Attempt, AttemptError> {
        let args = build_args(config, width, graph);
        tracing::info!(
            command = %config.command,
            args = ?args,
            width,
            "spawning solver attempt"
        );

        let mut child = Command::new(&config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0) // New process group for clean kill
            .spawn()
            .map_err(|e| AttemptError::Spawn { source: e })?;

        let pid = child.id().unwrap_or(0);
        let stdout = child.stdout.take();
        tracing::debug!(pid, "solver subprocess started");

        Ok(Attempt {
            width,
            child,
            stdout,
            pid,
        })
    }

    /// Wait for the solver to exit and return its captured raw output.
    ///
    /// Blocks only this task. After a `kill`, calling this again reaps
    /// the child; the output pipe is gone by then and the result is
    /// whatever was read before the kill (usually nothing).
    pub async fn wait(&mut self) -> Result<Vec<u8>, AttemptError> {
        let mut raw = Vec::new();
        if let Some(mut stdout) = self.stdout.take() {
            stdout
                .read_to_end(&mut raw)
                .await
                .map_err(|e| AttemptError::Wait { source: e })?;
        }
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| AttemptError::Wait { source: e })?;

        tracing::info!(
            exit_code = ?status.code(),
            output_bytes = raw.len(),
            width = self.width,
            "solver attempt finished"
        );
        Ok(raw)
    }

    /// Best-effort SIGKILL of the solver's process group.
    ///
    /// Callable at any time; after a normal exit the group is gone and
    /// this is a no-op. Grandchildren that escaped the group are not
    /// chased.
    pub fn kill(&self) {
        if self.pid == 0 {
            return;
        }
        match killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
            Ok(()) => tracing::warn!(pid = self.pid, "killed solver process group"),
            Err(nix::errno::Errno::ESRCH) => {
                // Already exited
                tracing::debug!(pid = self.pid, "solver process group already gone");
            }
            Err(e) => {
                tracing::warn!(pid = self.pid, error = %e, "failed to kill solver process group");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh_config(script: &str) -> SolverConfig {
        SolverConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[test]
    fn test_build_args_substitutes_placeholders() {
        let config = SolverConfig::default();
        let args = build_args(&config, 7, Path::new("graphs/kakuro.hg"));
        assert_eq!(
            args,
            vec!["-width", "7", "-graph", "graphs/kakuro.hg", "-det"]
        );
    }

    #[test]
    fn test_build_args_no_placeholder() {
        let config = sh_config("echo hi");
        let args = build_args(&config, 3, Path::new("g.hg"));
        assert_eq!(args, vec!["-c", "echo hi"]);
    }

    #[test]
    fn test_build_args_repeated_placeholder() {
        let config = SolverConfig {
            command: "solver".to_string(),
            args: vec!["{width}".to_string(), "{width}".to_string()],
        };
        let args = build_args(&config, 12, Path::new("g.hg"));
        assert_eq!(args, vec!["12", "12"]);
    }

    #[tokio::test]
    async fn test_wait_captures_stdout() {
        let config = sh_config("echo 'Width: 3'; echo 'Correct: true'");
        let mut attempt = Attempt::spawn(&config, 3, Path::new("unused.hg")).unwrap();
        let raw = attempt.wait().await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("Width: 3"));
        assert!(text.contains("Correct: true"));
    }

    #[tokio::test]
    async fn test_stderr_is_not_captured() {
        let config = sh_config("echo out; echo noise >&2");
        let mut attempt = Attempt::spawn(&config, 1, Path::new("unused.hg")).unwrap();
        let raw = attempt.wait().await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("out"));
        assert!(!text.contains("noise"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_distinct() {
        let config = SolverConfig {
            command: "nonexistent-solver-xyz".to_string(),
            args: vec![],
        };
        let err = Attempt::spawn(&config, 1, Path::new("unused.hg")).unwrap_err();
        assert!(matches!(err, AttemptError::Spawn { .. }));
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_kill_terminates_long_running_solver() {
        let config = sh_config("sleep 30");
        let mut attempt = Attempt::spawn(&config, 1, Path::new("unused.hg")).unwrap();

        let start = Instant::now();
        attempt.kill();
        let _ = attempt.wait().await;
        // Reaped well before the sleep would have finished
        assert!(start.elapsed().as_secs() < 5);
    }

    #[tokio::test]
    async fn test_kill_after_exit_is_noop() {
        let config = sh_config("echo done");
        let mut attempt = Attempt::spawn(&config, 1, Path::new("unused.hg")).unwrap();
        let _ = attempt.wait().await.unwrap();
        // Must not panic or error loudly
        attempt.kill();
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_yields_output() {
        let config = sh_config("echo 'Correct: false'; exit 3");
        let mut attempt = Attempt::spawn(&config, 1, Path::new("unused.hg")).unwrap();
        // Only the text matters; the exit code is not part of the contract
        let raw = attempt.wait().await.unwrap();
        assert!(String::from_utf8_lossy(&raw).contains("Correct: false"));
    }
}
