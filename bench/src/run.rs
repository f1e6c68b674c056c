//! Benchmark orchestration: agent invocation, execution, scoring.
//!
//! One task's failure must not abort the run: agent apply errors and
//! execution timeouts skip the task without emitting a result. Anything
//! else is fatal.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Result, bail};
use tracing::{info, instrument, warn};

use crate::agent::{Agent, AgentError};
use crate::env::{EnvProvider, ExecError};
use crate::executor::run_and_get_result;
use crate::report::print_results;
use crate::types::{Benchmark, TaskResult};

/// Run every task in `benchmark` (optionally filtered to `task_filter`) and
/// collect results for the tasks that completed.
///
/// The recorded duration covers only the agent's improve call. When
/// `verbose` is set, cumulative results are printed after every task.
#[instrument(skip_all, fields(benchmark = %benchmark.name))]
pub fn run<A: Agent, P: EnvProvider>(
    agent: &A,
    provider: &P,
    benchmark: &Benchmark,
    task_filter: Option<&str>,
    verbose: bool,
) -> Result<Vec<TaskResult>> {
    let mut task_results = Vec::new();
    for task in &benchmark.tasks {
        if let Some(filter) = task_filter
            && task.name != filter
        {
            continue;
        }
        info!(task = %task.name, "running task");

        // Authoring error, not a runtime condition: abort the whole run.
        if let (Some(inputs), Some(assertions)) = (&task.inputs, &task.assertions)
            && inputs.len() != assertions.len()
        {
            bail!(
                "task {}: {} inputs but {} assertion sets",
                task.name,
                inputs.len(),
                assertions.len()
            );
        }

        let started = Instant::now();
        let files = match agent.improve(&task.initial_code, &task.prompt) {
            Ok(files) => files,
            Err(AgentError::Apply(message)) => {
                warn!(task = %task.name, %message, "agent output rejected, skipping task");
                continue;
            }
            Err(AgentError::Other(err)) => {
                return Err(err.context(format!("agent failed on task {}", task.name)));
            }
        };
        let duration = started.elapsed();

        let exec_results = match run_and_get_result(provider, &files, task, benchmark) {
            Ok(results) => results,
            Err(ExecError::Timeout(timeout)) => {
                warn!(task = %task.name, ?timeout, "execution timed out, skipping task");
                continue;
            }
            Err(ExecError::Other(err)) => {
                return Err(err.context(format!("execution failed on task {}", task.name)));
            }
        };

        let mut assertion_results = Vec::new();
        for (index, assertion_map) in task
            .assertions
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .enumerate()
        {
            let Some(assertable) = exec_results.get(index) else {
                bail!(
                    "task {}: assertion set {index} has no matching execution result",
                    task.name
                );
            };
            let outcomes: BTreeMap<String, bool> = assertion_map
                .iter()
                .map(|(name, assertion)| (name.clone(), assertion(assertable)))
                .collect();
            assertion_results.push(outcomes);
        }

        task_results.push(TaskResult {
            task_name: task.name.clone(),
            assertion_results,
            duration,
        });

        if verbose {
            print_results(&task_results);
        }
    }
    Ok(task_results)
}
