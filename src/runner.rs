// GSD MCP Server - gsd-tools Runner
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Spawns `node gsd-tools.js <command> <args..>` in a project directory.
// Hard wall-clock timeout and a combined stdout+stderr size cap.
// Output is relayed verbatim, never interpreted.

use crate::config::ServerConfig;
use crate::error::RunnerError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Captured output of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: PathBuf,
    entry_point: PathBuf,
    timeout: Duration,
    max_output: usize,
}

impl ToolRunner {
    pub fn new(config: &ServerConfig, entry_point: PathBuf) -> Self {
        Self {
            program: config.node_binary.clone(),
            entry_point,
            timeout: config.tool_timeout,
            max_output: config.max_output_bytes,
        }
    }

    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Run one command. Non-zero exit, timeout and overflow are all failures.
    pub async fn run(
        &self,
        command: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ToolOutput, RunnerError> {
        log::debug!(
            "gsd-tools {} {:?} (cwd {:?}, timeout {:?})",
            command,
            args,
            cwd,
            self.timeout
        );

        let mut child = Command::new(&self.program)
            .arg(&self.entry_point)
            .arg(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.max_output;

        let collect = async {
            let (out, err) = tokio::try_join!(read_capped(stdout, cap), read_capped(stderr, cap))?;
            if out.len() + err.len() > cap {
                return Err(RunnerError::OutputOverflow(cap));
            }
            let status = child.wait().await?;
            Ok((status, out, err))
        };

        let (status, out, err) = match tokio::time::timeout(self.timeout, collect).await {
            Ok(result) => result?,
            Err(_) => return Err(RunnerError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&out).into_owned();
        let stderr = String::from_utf8_lossy(&err).into_owned();
        if !status.success() {
            return Err(RunnerError::Failed {
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

/// Read a pipe to EOF. Fails as soon as this pipe alone passes `cap`,
/// without waiting on the other one.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    cap: usize,
) -> Result<Vec<u8>, RunnerError> {
    let mut buf = Vec::new();
    if let Some(reader) = reader {
        reader.take(cap as u64 + 1).read_to_end(&mut buf).await?;
    }
    if buf.len() > cap {
        return Err(RunnerError::OutputOverflow(cap));
    }
    Ok(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Runner that executes `sh <script> <command> <args..>` instead of node.
    fn sh_runner(script: &Path, timeout: Duration, max_output: usize) -> ToolRunner {
        let config = ServerConfig {
            node_binary: PathBuf::from("sh"),
            tool_timeout: timeout,
            max_output_bytes: max_output,
            ..ServerConfig::default()
        };
        ToolRunner::new(&config, script.to_path_buf())
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("gsd-tools.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn relays_stdout_and_stderr() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "echo \"$1 $2\"\necho warn >&2\n");
        let runner = sh_runner(&script, Duration::from_secs(10), 1024);

        let out = runner
            .run("state", &["load".to_string()], dir.path())
            .await
            .unwrap();
        assert_eq!(out.stdout, "state load\n");
        assert_eq!(out.stderr, "warn\n");
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempdir().unwrap();
        let project = tempdir().unwrap();
        let script = write_script(dir.path(), "pwd\n");
        let runner = sh_runner(&script, Duration::from_secs(10), 4096);

        let out = runner.run("where", &[], project.path()).await.unwrap();
        let reported = PathBuf::from(out.stdout.trim()).canonicalize().unwrap();
        assert_eq!(reported, project.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'no STATE.md' >&2\nexit 3\n");
        let runner = sh_runner(&script, Duration::from_secs(10), 1024);

        let err = runner.run("state", &[], dir.path()).await.unwrap_err();
        match &err {
            RunnerError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "no STATE.md");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(err.to_string().contains("no STATE.md"));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 5\n");
        let runner = sh_runner(&script, Duration::from_millis(200), 1024);

        let started = std::time::Instant::now();
        let err = runner.run("slow", &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, RunnerError::Timeout(_)), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn combined_output_is_capped() {
        let dir = tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "head -c 600 /dev/zero\nhead -c 600 /dev/zero >&2\n",
        );
        let runner = sh_runner(&script, Duration::from_secs(10), 1000);

        let err = runner.run("noisy", &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, RunnerError::OutputOverflow(1000)), "{:?}", err);
    }

    #[tokio::test]
    async fn overflow_does_not_wait_for_the_other_pipe() {
        let dir = tempdir().unwrap();
        // stdout overflows while stderr stays open behind the sleep
        let script = write_script(dir.path(), "head -c 5000 /dev/zero\nsleep 5\n");
        let runner = sh_runner(&script, Duration::from_secs(3), 1000);

        let started = std::time::Instant::now();
        let err = runner.run("noisy", &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, RunnerError::OutputOverflow(1000)), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let dir = tempdir().unwrap();
        let config = ServerConfig {
            node_binary: PathBuf::from("/nonexistent/bin/node"),
            ..ServerConfig::default()
        };
        let runner = ToolRunner::new(&config, dir.path().join("gsd-tools.js"));

        let err = runner
            .run("state", &["load".to_string()], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }), "{:?}", err);
        assert!(err.to_string().contains("/nonexistent/bin/node"));
    }
}
