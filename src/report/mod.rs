use colored::Colorize;
use tracing::instrument;

use crate::squash::SquashOutcome;

/// Print the steps of a squash run to the terminal.
///
/// Progress lines are printed as-is; the final line is green on success
/// and red on failure:
///
/// Will attempt to squash PR 42 at org/repo
/// Getting PR information…
/// ...
/// All done!
#[instrument(skip_all, fields(steps = outcome.steps.len(), ok = outcome.succeeded()))]
pub fn print_terminal_report(outcome: &SquashOutcome) {
    println!();
    for line in terminal_lines(outcome) {
        println!("{line}");
    }
    println!();
}

fn terminal_lines(outcome: &SquashOutcome) -> Vec<String> {
    let count = outcome.steps.len();
    outcome
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let text = step.plain();
            if i + 1 < count {
                format!("  {text}")
            } else if outcome.succeeded() {
                format!("  {}", text.green().bold())
            } else {
                format!("  {}", text.red().bold())
            }
        })
        .collect()
}
