//! Execution environment capability and its disk-backed implementation.
//!
//! Every task input runs in a freshly created environment seeded from the
//! same produced file set. [`DiskExecutionEnv`] backs this with a scratch
//! directory and `sh -c`; output pipes are drained on reader threads so a
//! chatty child cannot deadlock the wait.

use std::fs;
use std::io::Read;
use std::path::{Component, Path};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::types::FilesDict;

/// Maximum bytes kept from each of stdout and stderr.
const OUTPUT_LIMIT_BYTES: usize = 50_000;

/// Failure modes of a task-input execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process outlived the benchmark timeout and was killed.
    /// Recoverable: the runner skips the task and continues.
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),
    /// Infrastructure failure; aborts the run.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Captured output of a completed child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded beyond the capture limit.
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Isolated filesystem the agent's produced files are executed in.
pub trait ExecutionEnv {
    /// Write the file set into the environment.
    fn upload(&mut self, files: &FilesDict) -> Result<()>;
    /// Spawn a command inside the environment.
    fn spawn(&mut self, command: &str) -> Result<Box<dyn ProcessHandle>>;
}

/// A spawned command awaiting completion.
pub trait ProcessHandle {
    /// Wait for completion, killing the process when `timeout` elapses.
    fn wait_with_timeout(&mut self, timeout: Duration) -> Result<ProcessOutput, ExecError>;
}

/// Hands out a fresh environment per task input.
pub trait EnvProvider {
    fn create(&self) -> Result<Box<dyn ExecutionEnv>>;
}

/// Scratch-directory environment. Commands run under `sh -c` with the
/// directory as working dir; the directory is removed on drop.
pub struct DiskExecutionEnv {
    workdir: TempDir,
}

impl DiskExecutionEnv {
    pub fn create() -> Result<Self> {
        let workdir = TempDir::with_prefix("bench-env-").context("create scratch dir")?;
        Ok(Self { workdir })
    }

    pub fn path(&self) -> &Path {
        self.workdir.path()
    }
}

impl ExecutionEnv for DiskExecutionEnv {
    fn upload(&mut self, files: &FilesDict) -> Result<()> {
        for (name, contents) in files {
            let relative = Path::new(name);
            if relative.is_absolute()
                || relative
                    .components()
                    .any(|part| matches!(part, Component::ParentDir))
            {
                bail!("refusing to write outside the workspace: {name}");
            }
            let path = self.workdir.path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create dir {}", parent.display()))?;
            }
            fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        }
        debug!(file_count = files.len(), workdir = %self.workdir.path().display(), "files uploaded");
        Ok(())
    }

    fn spawn(&mut self, command: &str) -> Result<Box<dyn ProcessHandle>> {
        debug!(command, "spawning command");
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn command {command:?}"))?;
        Ok(Box::new(DiskProcess { child }))
    }
}

struct DiskProcess {
    child: Child,
}

impl ProcessHandle for DiskProcess {
    fn wait_with_timeout(&mut self, timeout: Duration) -> Result<ProcessOutput, ExecError> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let stdout_handle = thread::spawn(move || read_stream_limited(stdout, OUTPUT_LIMIT_BYTES));
        let stderr_handle = thread::spawn(move || read_stream_limited(stderr, OUTPUT_LIMIT_BYTES));

        let status = match self.child.wait_timeout(timeout).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
                self.child.kill().ok();
                self.child.wait().context("wait command after kill")?;
                // Drain the readers before reporting so the threads finish.
                let _ = join_output(stdout_handle);
                let _ = join_output(stderr_handle);
                return Err(ExecError::Timeout(timeout));
            }
        };

        let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
        let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

        if stdout_truncated > 0 || stderr_truncated > 0 {
            warn!(stdout_truncated, stderr_truncated, "output truncated");
        }

        debug!(exit_code = ?status.code(), "command finished");
        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

/// Provider handing out fresh [`DiskExecutionEnv`] instances.
pub struct DiskEnvProvider;

impl EnvProvider for DiskEnvProvider {
    fn create(&self) -> Result<Box<dyn ExecutionEnv>> {
        Ok(Box::new(DiskExecutionEnv::create()?))
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn files(entries: &[(&str, &str)]) -> FilesDict {
        entries
            .iter()
            .map(|(name, contents)| (name.to_string(), contents.to_string()))
            .collect()
    }

    #[test]
    fn uploads_nested_files() {
        let mut env = DiskExecutionEnv::create().expect("env");
        env.upload(&files(&[("sub/dir/data.txt", "payload")]))
            .expect("upload");
        let contents = fs::read_to_string(env.path().join("sub/dir/data.txt")).expect("read");
        assert_eq!(contents, "payload");
    }

    #[test]
    fn rejects_paths_escaping_the_workspace() {
        let mut env = DiskExecutionEnv::create().expect("env");
        let err = env
            .upload(&files(&[("../escape.txt", "nope")]))
            .expect_err("traversal rejected");
        assert!(err.to_string().contains("outside the workspace"));

        let err = env
            .upload(&files(&[("/etc/escape.txt", "nope")]))
            .expect_err("absolute rejected");
        assert!(err.to_string().contains("outside the workspace"));
    }

    #[test]
    fn captures_stdout_stderr_and_exit_code() {
        let mut env = DiskExecutionEnv::create().expect("env");
        env.upload(&BTreeMap::new()).expect("upload");
        let mut process = env
            .spawn("printf out; printf err >&2; exit 3")
            .expect("spawn");
        let output = process
            .wait_with_timeout(Duration::from_secs(5))
            .expect("wait");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, b"out");
        assert_eq!(output.stderr, b"err");
    }

    #[test]
    fn commands_run_in_the_uploaded_workspace() {
        let mut env = DiskExecutionEnv::create().expect("env");
        env.upload(&files(&[("data.txt", "from workspace")]))
            .expect("upload");
        let mut process = env.spawn("cat data.txt").expect("spawn");
        let output = process
            .wait_with_timeout(Duration::from_secs(5))
            .expect("wait");
        assert!(output.success());
        assert_eq!(output.stdout, b"from workspace");
    }

    #[test]
    fn timeout_kills_the_process() {
        let mut env = DiskExecutionEnv::create().expect("env");
        let mut process = env.spawn("sleep 5").expect("spawn");
        let err = process
            .wait_with_timeout(Duration::from_millis(100))
            .expect_err("times out");
        match err {
            ExecError::Timeout(timeout) => assert_eq!(timeout, Duration::from_millis(100)),
            ExecError::Other(err) => panic!("expected timeout, got {err}"),
        }
    }

    #[test]
    fn capture_is_bounded() {
        let data = vec![b'x'; 100];
        let (captured, truncated) = read_stream_limited(&data[..], 16).expect("read");
        assert_eq!(captured.len(), 16);
        assert_eq!(truncated, 84);
    }
}
