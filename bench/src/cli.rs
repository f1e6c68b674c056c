//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::agent::CommandAgent;
use crate::env::DiskEnvProvider;
use crate::report::print_results;
use crate::run::run;
use crate::suite::SuiteFile;

/// Print the task names in a suite.
pub fn list_tasks(suite_path: &Path) -> Result<()> {
    let suite = SuiteFile::load(suite_path)?;
    for task in &suite.tasks {
        println!("{}", task.name);
    }
    Ok(())
}

/// Run a suite against an external agent command and print the report.
pub fn run_suite(
    suite_path: &Path,
    agent_cmd: &str,
    task_filter: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let suite = SuiteFile::load(suite_path)?;
    let benchmark = suite.into_benchmark().context("build benchmark")?;
    debug!(benchmark = %benchmark.name, tasks = benchmark.tasks.len(), "suite loaded");

    if let Some(filter) = task_filter
        && !benchmark.tasks.iter().any(|task| task.name == filter)
    {
        bail!("task {filter} not found in suite {}", benchmark.name);
    }

    let agent = CommandAgent::new(agent_cmd);
    let results = run(&agent, &DiskEnvProvider, &benchmark, task_filter, verbose)?;
    print_results(&results);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SUITE: &str = r#"
[suite]
name = "smoke"
timeout_secs = 5

[[tasks]]
name = "noop"
prompt = "do nothing"
"#;

    #[test]
    fn unknown_task_filter_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("suite.toml");
        fs::write(&path, SUITE).expect("write suite");

        let err = run_suite(&path, "cat > /dev/null; printf '{}'", Some("ghost"), false)
            .expect_err("unknown task");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn listing_a_missing_suite_fails_with_context() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = list_tasks(&temp.path().join("absent.toml")).expect_err("missing file");
        assert!(err.to_string().contains("read suite"));
    }
}
