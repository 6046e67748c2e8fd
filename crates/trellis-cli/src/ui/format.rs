//! Formatting utilities for sizes, durations, and the build summary.

use owo_colors::OwoColorize;
use std::time::Duration;

/// Format a byte count in human-readable units.
///
/// # Examples
///
/// ```
/// use trellis_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration in human-readable units.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trellis_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        format!("{}m {}s", minutes, seconds)
    }
}

/// One row of the build summary table.
#[derive(Debug, Clone)]
pub struct BundleRow {
    pub path: String,
    pub size: u64,
    /// Estimated gzip transfer size, present for optimized builds.
    pub transfer_size: Option<u64>,
    pub initial: bool,
}

/// Print the post-build bundle table.
///
/// Initial files first with a combined total, then the lazy-chunk
/// section.
pub fn print_build_summary(rows: &[BundleRow], elapsed: Duration) {
    let width = rows.iter().map(|r| r.path.len()).max().unwrap_or(20).max(20);
    let has_transfer = rows.iter().any(|r| r.transfer_size.is_some());

    let header = if has_transfer {
        format!("{:<width$}  {:>10}  {:>14}", "Initial files", "Raw size", "Transfer size")
    } else {
        format!("{:<width$}  {:>10}", "Initial files", "Raw size")
    };
    eprintln!("{}", header.bold());

    let mut initial_total = 0u64;
    for row in rows.iter().filter(|r| r.initial) {
        initial_total += row.size;
        print_row(row, width, has_transfer);
    }
    eprintln!(
        "{:<width$}  {:>10}",
        "Initial total".bold(),
        format_size(initial_total).bold()
    );

    if rows.iter().any(|r| !r.initial) {
        eprintln!();
        eprintln!("{}", format!("{:<width$}  {:>10}", "Lazy chunks", "Raw size").bold());
        for row in rows.iter().filter(|r| !r.initial) {
            print_row(row, width, has_transfer);
        }
    }

    eprintln!();
    eprintln!("Build completed in {}", format_duration(elapsed).green());
}

fn print_row(row: &BundleRow, width: usize, has_transfer: bool) {
    match (has_transfer, row.transfer_size) {
        (true, Some(transfer)) => eprintln!(
            "{:<width$}  {:>10}  {:>14}",
            row.path,
            format_size(row.size),
            format_size(transfer)
        ),
        (true, None) => eprintln!(
            "{:<width$}  {:>10}  {:>14}",
            row.path,
            format_size(row.size),
            "-"
        ),
        (false, _) => eprintln!("{:<width$}  {:>10}", row.path, format_size(row.size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_round_to_two_decimals() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5_242_880), "5.00 MB");
    }

    #[test]
    fn durations_choose_sensible_units() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
    }
}
