//! Test-only fakes and builders for harness capabilities.

use std::time::Duration;

use anyhow::{Result, bail};

use crate::agent::{Agent, AgentError};
use crate::env::{EnvProvider, ExecError, ExecutionEnv, ProcessHandle, ProcessOutput};
use crate::types::{Assertable, FilesDict};

/// Build a files dict from (path, contents) pairs.
pub fn files(entries: &[(&str, &str)]) -> FilesDict {
    entries
        .iter()
        .map(|(name, contents)| (name.to_string(), contents.to_string()))
        .collect()
}

/// Environment that accepts uploads and refuses to spawn.
pub struct NullEnv;

impl ExecutionEnv for NullEnv {
    fn upload(&mut self, _files: &FilesDict) -> Result<()> {
        Ok(())
    }

    fn spawn(&mut self, _command: &str) -> Result<Box<dyn ProcessHandle>> {
        bail!("NullEnv cannot spawn commands");
    }
}

/// Assertable for a completed process with the given streams.
pub fn executed_assertable(
    files: FilesDict,
    stdout: &str,
    stderr: &str,
    exit_code: i32,
) -> Assertable {
    Assertable {
        files,
        env: Box::new(NullEnv),
        process: Some(ProcessOutput {
            exit_code: Some(exit_code),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            stdout_truncated: 0,
            stderr_truncated: 0,
        }),
        stdout: Some(stdout.to_string()),
        stderr: Some(stderr.to_string()),
    }
}

/// Assertable for a command-less task.
pub fn sentinel_assertable(files: FilesDict) -> Assertable {
    Assertable {
        files,
        env: Box::new(NullEnv),
        process: None,
        stdout: None,
        stderr: None,
    }
}

/// Agent that fails with an apply error on one specific prompt and passes
/// the initial code through otherwise.
pub struct RejectingAgent {
    pub reject_prompt: String,
}

impl Agent for RejectingAgent {
    fn improve(&self, initial_code: &FilesDict, prompt: &str) -> Result<FilesDict, AgentError> {
        if prompt == self.reject_prompt {
            return Err(AgentError::Apply("scripted rejection".to_string()));
        }
        Ok(initial_code.clone())
    }
}

/// Provider of scripted environments that never touch the filesystem.
///
/// Spawned processes echo their command line to stdout and exit 0; command
/// lines containing `hang` time out instead.
pub struct ScriptedEnvProvider;

impl EnvProvider for ScriptedEnvProvider {
    fn create(&self) -> Result<Box<dyn ExecutionEnv>> {
        Ok(Box::new(ScriptedEnv))
    }
}

struct ScriptedEnv;

impl ExecutionEnv for ScriptedEnv {
    fn upload(&mut self, _files: &FilesDict) -> Result<()> {
        Ok(())
    }

    fn spawn(&mut self, command: &str) -> Result<Box<dyn ProcessHandle>> {
        Ok(Box::new(ScriptedProcess {
            command: command.to_string(),
        }))
    }
}

struct ScriptedProcess {
    command: String,
}

impl ProcessHandle for ScriptedProcess {
    fn wait_with_timeout(&mut self, timeout: Duration) -> Result<ProcessOutput, ExecError> {
        if self.command.contains("hang") {
            return Err(ExecError::Timeout(timeout));
        }
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: self.command.clone().into_bytes(),
            stderr: Vec::new(),
            stdout_truncated: 0,
            stderr_truncated: 0,
        })
    }
}
