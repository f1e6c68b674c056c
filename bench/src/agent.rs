//! Agent capability: maps starting code plus a prompt to a produced file set.
//!
//! The [`Agent`] trait decouples the runner from the code-generation
//! backend. [`CommandAgent`] shells out to a configured command; tests use
//! fakes that return predetermined file sets.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::types::FilesDict;

/// Failure modes of an agent invocation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent produced output that could not be applied as a file set.
    /// Recoverable: the runner skips the task and continues.
    #[error("could not apply agent output: {0}")]
    Apply(String),
    /// Infrastructure failure; aborts the run.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Code-generation backend.
pub trait Agent {
    /// Produce an improved file set for `initial_code` given `prompt`.
    fn improve(&self, initial_code: &FilesDict, prompt: &str) -> Result<FilesDict, AgentError>;
}

/// Request payload fed to a [`CommandAgent`] process on stdin.
#[derive(Debug, Serialize)]
struct AgentRequest<'a> {
    prompt: &'a str,
    files: &'a FilesDict,
}

/// Agent backend that spawns a shell command.
///
/// The command receives `{"prompt": ..., "files": {...}}` as JSON on stdin
/// and must print the produced file set as a JSON object on stdout.
pub struct CommandAgent {
    command: String,
}

impl CommandAgent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Agent for CommandAgent {
    #[instrument(skip_all, fields(command = %self.command))]
    fn improve(&self, initial_code: &FilesDict, prompt: &str) -> Result<FilesDict, AgentError> {
        let request = serde_json::to_vec(&AgentRequest {
            prompt,
            files: initial_code,
        })
        .context("serialize agent request")?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn agent command {:?}", self.command))?;
        child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?
            .write_all(&request)
            .context("write agent request")?;

        let output = child.wait_with_output().context("wait for agent")?;
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent command failed");
            return Err(AgentError::Other(anyhow!(
                "agent command failed with status {:?}",
                output.status.code()
            )));
        }

        let files: FilesDict = serde_json::from_slice(&output.stdout).map_err(|err| {
            AgentError::Apply(format!("agent output is not a files object: {err}"))
        })?;
        debug!(file_count = files.len(), "agent produced files");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_files_from_agent_stdout() {
        let agent = CommandAgent::new(r#"cat > /dev/null; printf '%s' '{"main.py": "print(1)"}'"#);
        let files = agent.improve(&BTreeMap::new(), "do it").expect("improve");
        assert_eq!(files.get("main.py").map(String::as_str), Some("print(1)"));
    }

    #[test]
    fn unparseable_output_is_an_apply_error() {
        let agent = CommandAgent::new("cat > /dev/null; echo not json");
        let err = agent
            .improve(&BTreeMap::new(), "do it")
            .expect_err("bad output");
        match err {
            AgentError::Apply(message) => assert!(message.contains("not a files object")),
            AgentError::Other(err) => panic!("expected apply error, got {err}"),
        }
    }

    #[test]
    fn failing_agent_command_is_fatal() {
        let agent = CommandAgent::new("cat > /dev/null; exit 1");
        let err = agent
            .improve(&BTreeMap::new(), "do it")
            .expect_err("agent failed");
        assert!(matches!(err, AgentError::Other(_)));
    }

    #[test]
    fn request_reaches_the_agent_on_stdin() {
        // The command only emits a files object if the prompt arrived on stdin.
        let agent =
            CommandAgent::new(r#"grep -q improve_me_token && printf '%s' '{"ok.txt": "yes"}'"#);
        let initial = BTreeMap::from([("lib.rs".to_string(), "fn main() {}".to_string())]);
        let files = agent.improve(&initial, "improve_me_token").expect("improve");
        assert_eq!(files.get("ok.txt").map(String::as_str), Some("yes"));
    }
}
