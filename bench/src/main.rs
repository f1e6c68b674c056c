use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use bench::{cli, logging};

#[derive(Parser)]
#[command(name = "bench", version, about = "Benchmark harness for code-generation agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tasks in a suite file.
    List { suite: PathBuf },
    /// Run a suite and print per-task and aggregate results.
    Run {
        suite: PathBuf,
        /// Shell command implementing the agent: request JSON on stdin,
        /// produced files JSON on stdout.
        #[arg(long)]
        agent_cmd: String,
        /// Run only the named task.
        #[arg(long)]
        task: Option<String>,
        /// Print cumulative results after every task.
        #[arg(long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::List { suite } => cli::list_tasks(&suite),
        Command::Run {
            suite,
            agent_cmd,
            task,
            verbose,
        } => cli::run_suite(&suite, &agent_cmd, task.as_deref(), verbose),
    }
}
