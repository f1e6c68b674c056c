//! Console reporting of task results and aggregate statistics.

use std::collections::BTreeMap;

use crate::types::TaskResult;

/// Aggregate statistics over completed tasks.
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub total_duration_secs: f64,
    /// Tasks whose success rate is exactly 1.
    pub fully_correct_tasks: usize,
    pub total_tasks: usize,
    pub correct_assertions: usize,
    pub total_assertions: usize,
    /// Mean of per-task success rates, not a global assertion ratio.
    pub average_success_rate: f64,
}

pub fn summarize(results: &[TaskResult]) -> Summary {
    let total_duration_secs = results
        .iter()
        .map(|result| result.duration.as_secs_f64())
        .sum();
    let fully_correct_tasks = results
        .iter()
        .filter(|result| result.success_rate() == 1.0)
        .count();
    let correct_assertions = results
        .iter()
        .flat_map(|result| result.assertion_results.iter())
        .flat_map(BTreeMap::values)
        .filter(|passed| **passed)
        .count();
    let total_assertions = results
        .iter()
        .flat_map(|result| result.assertion_results.iter())
        .map(BTreeMap::len)
        .sum();
    let average_success_rate = if results.is_empty() {
        0.0
    } else {
        results.iter().map(TaskResult::success_rate).sum::<f64>() / results.len() as f64
    };

    Summary {
        total_duration_secs,
        fully_correct_tasks,
        total_tasks: results.len(),
        correct_assertions,
        total_assertions,
        average_success_rate,
    }
}

/// Print per-task assertion outcomes followed by the aggregate block.
pub fn print_results(results: &[TaskResult]) {
    for task_result in results {
        println!();
        println!("--- Results for {} ---", task_result.task_name);
        println!(
            "{} ({:.2}s)",
            task_result.task_name,
            task_result.duration.as_secs_f64()
        );
        for outcomes in &task_result.assertion_results {
            for (name, passed) in outcomes {
                let checkmark = if *passed { "✅" } else { "❌" };
                println!("  {checkmark} {name}");
            }
            println!();
        }
        println!();
    }

    println!("--- Results ---");
    if results.is_empty() {
        println!("No completed tasks to report");
        println!("--- Results ---");
        return;
    }

    let summary = summarize(results);
    println!("Total time: {:.2}s", summary.total_duration_secs);
    println!(
        "Completely correct tasks: {}/{}",
        summary.fully_correct_tasks, summary.total_tasks
    );
    println!(
        "Total correct assertions: {}/{}",
        summary.correct_assertions, summary.total_assertions
    );
    println!(
        "Average success rate: {:.1}% on {} tasks",
        summary.average_success_rate * 100.0,
        summary.total_tasks
    );
    println!("--- Results ---");
    println!();
}
