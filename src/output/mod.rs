//! Output formatting.
//!
//! - [`csv`] - batch request/result files
//! - [`terminal`] - command outcomes for the terminal

mod csv;
mod terminal;

pub use self::csv::{default_output_file, read_requests, run_batch_files, write_results};
pub use terminal::{format_field, outcome_lines, print_error, print_outcome};
