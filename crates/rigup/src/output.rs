//! Terminal output for the human surface.
//!
//! Everything here prints; nothing returns strings. When `--json` is
//! active the commands bypass this module entirely so the envelope owns
//! stdout.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a section header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Print one planned app action: right-aligned status column, skips
/// dimmed so the installs stand out in a long manifest.
pub fn action_line(status: &str, reference: &str) {
    let column = format!("{status:>8}");
    let styled = if status == "skip" {
        style(column).dim()
    } else {
        style(column).cyan()
    };
    println!("  {}  {}", styled, reference);
}

/// Print one plan-diff line: `+` added, `-` removed, `~` status change.
pub fn diff_line(glyph: char, text: &str) {
    let styled = match glyph {
        '+' => style(glyph).green(),
        '-' => style(glyph).red(),
        _ => style(glyph).yellow(),
    };
    println!("  {} {}", styled, text);
}

/// Create a spinner for long-running restore and export phases
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
