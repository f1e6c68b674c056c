//! Suite file parsing and validation.
//!
//! Suites are TOML files defining a benchmark: its tasks, their starting
//! files, and declarative per-input checks that compile to named assertion
//! predicates.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::{Assertable, AssertionFn, AssertionMap, Benchmark, Task};

/// A parsed suite file: benchmark metadata plus task definitions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SuiteFile {
    pub suite: SuiteMeta,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
}

/// Suite metadata: identifier and shared execution timeout.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SuiteMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub name: String,
    /// Applied to every task-input execution.
    pub timeout_secs: u64,
}

/// One task definition as authored in the suite file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TaskDef {
    pub name: String,
    /// Instruction text passed to the agent.
    pub prompt: String,
    /// Starting file set handed to the agent.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Command template; each input is appended as a quoted trailing token.
    pub command: Option<String>,
    pub inputs: Option<Vec<String>>,
    /// One block of checks per input.
    #[serde(default)]
    pub expect: Vec<ExpectBlock>,
}

/// Checks evaluated against the execution of one input.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExpectBlock {
    pub checks: Vec<Check>,
}

/// Declarative check compiled to a named assertion predicate.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// Stdout contains the value.
    StdoutContains { value: String },
    /// Stdout equals the value, ignoring trailing whitespace.
    StdoutEquals { value: String },
    /// Stderr contains the value.
    StderrContains { value: String },
    /// The process exited with the given code.
    ExitCode { value: i32 },
    /// The produced file set contains the path.
    FileExists { path: String },
    /// The produced file at `path` contains the value.
    FileContains { path: String, value: String },
}

impl SuiteFile {
    /// Load and validate a suite file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read suite {}", path.display()))?;
        let suite: SuiteFile = toml::from_str(&contents)
            .with_context(|| format!("parse suite {}", path.display()))?;
        suite
            .validate()
            .with_context(|| format!("validate suite {}", path.display()))?;
        Ok(suite)
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let suite: SuiteFile = toml::from_str(contents).context("parse suite")?;
        suite.validate()?;
        Ok(suite)
    }

    fn validate(&self) -> Result<()> {
        validate_slug("suite.name", &self.suite.name)?;
        if self.suite.timeout_secs == 0 {
            bail!("suite.timeout_secs must be > 0");
        }
        for (index, task) in self.tasks.iter().enumerate() {
            task.validate()
                .with_context(|| format!("tasks[{index}] invalid"))?;
        }
        let mut names: Vec<&str> = self.tasks.iter().map(|task| task.name.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                bail!("duplicate task name {}", pair[0]);
            }
        }
        Ok(())
    }

    /// Build the runnable [`Benchmark`], compiling checks to predicates.
    pub fn into_benchmark(self) -> Result<Benchmark> {
        let timeout = Duration::from_secs(self.suite.timeout_secs);
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for def in self.tasks {
            tasks.push(def.into_task()?);
        }
        Ok(Benchmark {
            name: self.suite.name,
            tasks,
            timeout,
        })
    }
}

impl TaskDef {
    fn validate(&self) -> Result<()> {
        validate_slug("name", &self.name)?;
        if self.prompt.trim().is_empty() {
            bail!("prompt must be non-empty");
        }
        if let Some(inputs) = &self.inputs
            && !self.expect.is_empty()
            && inputs.len() != self.expect.len()
        {
            bail!(
                "{} inputs but {} expect blocks",
                inputs.len(),
                self.expect.len()
            );
        }
        for (index, block) in self.expect.iter().enumerate() {
            if block.checks.is_empty() {
                bail!("expect[{index}].checks must be a non-empty array");
            }
            for check in &block.checks {
                check
                    .validate()
                    .with_context(|| format!("expect[{index}] invalid"))?;
            }
        }
        Ok(())
    }

    fn into_task(self) -> Result<Task> {
        let assertions = if self.expect.is_empty() {
            None
        } else {
            let mut sets = Vec::with_capacity(self.expect.len());
            for (index, block) in self.expect.iter().enumerate() {
                let mut map: AssertionMap = BTreeMap::new();
                for check in &block.checks {
                    let label = check.label();
                    if map.insert(label.clone(), check.to_assertion()).is_some() {
                        bail!(
                            "task {}: duplicate check {label} in expect[{index}]",
                            self.name
                        );
                    }
                }
                sets.push(map);
            }
            Some(sets)
        };
        Ok(Task {
            name: self.name,
            initial_code: self.files,
            prompt: self.prompt,
            command: self.command,
            inputs: self.inputs,
            assertions,
        })
    }
}

impl Check {
    fn validate(&self) -> Result<()> {
        match self {
            Check::StdoutContains { value }
            | Check::StdoutEquals { value }
            | Check::StderrContains { value } => {
                if value.is_empty() {
                    bail!("check value must be non-empty");
                }
            }
            Check::ExitCode { .. } => {}
            Check::FileExists { path } | Check::FileContains { path, .. } => {
                if path.trim().is_empty() {
                    bail!("check path must be non-empty");
                }
            }
        }
        Ok(())
    }

    /// Label used as the assertion name in reports.
    pub fn label(&self) -> String {
        match self {
            Check::StdoutContains { value } => format!("stdout_contains({value})"),
            Check::StdoutEquals { value } => format!("stdout_equals({value})"),
            Check::StderrContains { value } => format!("stderr_contains({value})"),
            Check::ExitCode { value } => format!("exit_code({value})"),
            Check::FileExists { path } => format!("file_exists({path})"),
            Check::FileContains { path, value } => format!("file_contains({path}, {value})"),
        }
    }

    /// Compile to a predicate over [`Assertable`].
    pub fn to_assertion(&self) -> AssertionFn {
        match self.clone() {
            Check::StdoutContains { value } => Box::new(move |assertable: &Assertable| {
                assertable
                    .stdout
                    .as_deref()
                    .is_some_and(|stdout| stdout.contains(&value))
            }),
            Check::StdoutEquals { value } => Box::new(move |assertable: &Assertable| {
                assertable
                    .stdout
                    .as_deref()
                    .is_some_and(|stdout| stdout.trim_end() == value)
            }),
            Check::StderrContains { value } => Box::new(move |assertable: &Assertable| {
                assertable
                    .stderr
                    .as_deref()
                    .is_some_and(|stderr| stderr.contains(&value))
            }),
            Check::ExitCode { value } => Box::new(move |assertable: &Assertable| {
                assertable
                    .process
                    .as_ref()
                    .is_some_and(|process| process.exit_code == Some(value))
            }),
            Check::FileExists { path } => {
                Box::new(move |assertable: &Assertable| assertable.files.contains_key(&path))
            }
            Check::FileContains { path, value } => Box::new(move |assertable: &Assertable| {
                assertable
                    .files
                    .get(&path)
                    .is_some_and(|contents| contents.contains(&value))
            }),
        }
    }
}

fn validate_slug(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} must be non-empty");
    }
    if !value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("{field} must use [a-z0-9_-] only");
    }
    Ok(())
}
