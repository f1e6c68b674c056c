//! Benchmark harness for code-generation agents.
//!
//! Drives an agent over a suite of tasks, executes the produced code in an
//! isolated scratch environment, and scores the outcome against per-input
//! assertions. The capability seams are explicit so tests can substitute
//! deterministic doubles:
//!
//! - **[`agent`]**: the code-generation backend ([`agent::Agent`]).
//! - **[`env`]**: process execution in isolated workspaces
//!   ([`env::ExecutionEnv`], [`env::EnvProvider`]).
//! - **[`executor`]**, **[`run`]**: orchestration — one environment per
//!   task input, timeout enforcement, partial-failure isolation between
//!   tasks.
//! - **[`report`]**: aggregate statistics and console rendering.
//! - **[`suite`]**: TOML suite files compiled to runnable benchmarks.

pub mod agent;
pub mod cli;
pub mod env;
pub mod executor;
pub mod logging;
pub mod report;
pub mod run;
pub mod suite;
#[cfg(test)]
pub mod test_support;
pub mod types;
