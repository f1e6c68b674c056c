//! Core data model for benchmarks, tasks, and their results.
//!
//! These types are the contract between the runner, the executor, and
//! assertion predicates. Assertions are opaque named predicates so suites
//! can compile declarative checks into them while tests pass closures
//! directly.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::env::{ExecutionEnv, ProcessOutput};

/// Produced file set: relative path to contents.
pub type FilesDict = BTreeMap<String, String>;

/// A named boolean predicate evaluated against an [`Assertable`].
pub type AssertionFn = Box<dyn Fn(&Assertable) -> bool>;

/// Assertions for one task input: assertion name to predicate.
pub type AssertionMap = BTreeMap<String, AssertionFn>;

/// One benchmark unit: starting code, a prompt, and an optional execution
/// command with per-input assertions.
pub struct Task {
    pub name: String,
    /// File set handed to the agent as its starting point.
    pub initial_code: FilesDict,
    /// Instruction text for the agent.
    pub prompt: String,
    /// Command template; each input is appended as a quoted trailing token.
    pub command: Option<String>,
    /// One entry per desired invocation of `command`.
    pub inputs: Option<Vec<String>>,
    /// One assertion map per input. Must match `inputs` in length when both
    /// are present.
    pub assertions: Option<Vec<AssertionMap>>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("initial_code", &self.initial_code)
            .field("prompt", &self.prompt)
            .field("command", &self.command)
            .field("inputs", &self.inputs)
            .field(
                "assertions",
                &self
                    .assertions
                    .as_ref()
                    .map(|maps| maps.iter().map(|m| m.keys().collect::<Vec<_>>()).collect::<Vec<_>>()),
            )
            .finish()
    }
}

/// A named collection of tasks sharing one execution timeout.
#[derive(Debug)]
pub struct Benchmark {
    pub name: String,
    pub tasks: Vec<Task>,
    /// Applied to every task-input execution.
    pub timeout: Duration,
}

/// Artifacts from one executed task input, handed to assertion predicates.
///
/// Holding `env` keeps the scratch workspace alive until every predicate
/// has run.
pub struct Assertable {
    /// The file set the agent produced.
    pub files: FilesDict,
    /// The environment the input ran in.
    pub env: Box<dyn ExecutionEnv>,
    /// Completed process info; `None` for command-less tasks.
    pub process: Option<ProcessOutput>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl fmt::Debug for Assertable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertable")
            .field("files", &self.files)
            .field("env", &"<dyn ExecutionEnv>")
            .field("process", &self.process)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .finish()
    }
}

/// Recorded outcome for one completed task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_name: String,
    /// One name-to-passed map per input, in input order.
    pub assertion_results: Vec<BTreeMap<String, bool>>,
    /// Wall-clock time of the agent's improve call only.
    pub duration: Duration,
}

impl TaskResult {
    /// Fraction of true assertion outcomes, in `[0, 1]`. Zero outcomes
    /// count as 0.
    pub fn success_rate(&self) -> f64 {
        let total: usize = self.assertion_results.iter().map(BTreeMap::len).sum();
        if total == 0 {
            return 0.0;
        }
        let correct = self
            .assertion_results
            .iter()
            .flat_map(BTreeMap::values)
            .filter(|passed| **passed)
            .count();
        correct as f64 / total as f64
    }
}
