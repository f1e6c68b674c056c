//! Task execution: one [`Assertable`] per task input.

use anyhow::Context;
use tracing::{debug, instrument};

use crate::env::{EnvProvider, ExecError};
use crate::types::{Assertable, Benchmark, FilesDict, Task};

/// Execute `task`'s command once per input, each against a fresh environment
/// seeded with `files`, or produce a single sentinel [`Assertable`] when the
/// task has no command.
///
/// A timeout aborts the remaining inputs for this task; the caller discards
/// any results already collected.
#[instrument(skip_all, fields(task = %task.name))]
pub fn run_and_get_result<P: EnvProvider>(
    provider: &P,
    files: &FilesDict,
    task: &Task,
    benchmark: &Benchmark,
) -> Result<Vec<Assertable>, ExecError> {
    let mut exec_results = Vec::new();

    let Some(command) = &task.command else {
        // The task is evaluated purely on file-set contents.
        let mut env = provider.create().context("create environment")?;
        env.upload(files).context("upload files")?;
        exec_results.push(Assertable {
            files: files.clone(),
            env,
            process: None,
            stdout: None,
            stderr: None,
        });
        return Ok(exec_results);
    };

    // An absent or empty input list still means one invocation, with an
    // empty trailing argument.
    let default_inputs = vec![String::new()];
    let inputs = match &task.inputs {
        Some(list) if !list.is_empty() => list,
        _ => &default_inputs,
    };
    for (index, input) in inputs.iter().enumerate() {
        debug!(index, input = %input, "running task input");
        let mut env = provider.create().context("create environment")?;
        env.upload(files).context("upload files")?;
        // Literal concatenation contract: the input lands as one
        // double-quoted trailing token, without escaping.
        let command_line = format!("{command} \"{input}\"");
        let mut process = env.spawn(&command_line).context("spawn task command")?;
        let output = process.wait_with_timeout(benchmark.timeout)?;
        exec_results.push(Assertable {
            files: files.clone(),
            env,
            stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            process: Some(output),
        });
    }

    Ok(exec_results)
}
