//! Terminal status output.

use colored::*;

/// Print a success message to stdout.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message to stderr.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message to stdout.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
