//! Terminal output utilities.
//!
//! Renders command outcomes and errors for an interactive user.

use crate::commands::Outcome;
use crate::error::Error;
use crate::processing::{usable_hosts, BatchResult};
use colored::Colorize;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// Plain-text lines for an outcome, without colours.
pub fn outcome_lines(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Allocated { owner, network } => {
            vec![format!("Allocated {network} to {owner}")]
        }
        Outcome::Records { keyword, records } if records.is_empty() => {
            vec![format!("No allocations found for {keyword}")]
        }
        Outcome::Records { keyword, records } => {
            let mut lines = vec![format!("Allocations for {keyword}:")];
            lines.extend(
                records
                    .iter()
                    .map(|r| format!("- {} ({})", r.prefix, r.description)),
            );
            lines
        }
        Outcome::Deallocated(network) => vec![format!("Deallocated {network}")],
        Outcome::Free { parent, blocks } if blocks.is_empty() => {
            vec![format!("No free space left in {parent}")]
        }
        Outcome::Free { parent, blocks } => {
            let mut lines = vec![format!("Free blocks in {parent}:")];
            lines.extend(blocks.iter().map(|b| {
                format!(
                    "{},{}",
                    format_field(b, 20),
                    format_field(format!("{}_hosts", usable_hosts(b.prefix_len())), 16)
                )
            }));
            lines
        }
        Outcome::Batch { output, results } => batch_lines(output, results),
    }
}

fn batch_lines(output: &str, results: &[BatchResult]) -> Vec<String> {
    let allocated = results.iter().filter(|r| r.is_allocated()).count();
    vec![format!(
        "Allocated {allocated} of {} requests, results saved to {output}",
        results.len()
    )]
}

/// Print an outcome to stdout.
pub fn print_outcome(outcome: &Outcome) {
    for (i, line) in outcome_lines(outcome).into_iter().enumerate() {
        if i == 0 {
            println!("{}", line.green());
        } else {
            println!("{line}");
        }
    }
}

/// Print an error with its kind to stderr.
pub fn print_error(err: &Error) {
    eprintln!("{} {}", format!("[{}]", err.kind()).on_red(), err);
}
