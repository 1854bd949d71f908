//! Progress display functionality for file transfers

use std::io::{self, Write};

use crate::transfer::{ProgressSink, TransferProgress};

const BAR_WIDTH: usize = 50;

/// Display a transfer progress line; without a known total only the byte
/// count and speed are shown
pub fn display_progress(progress: &TransferProgress) {
    let line = match progress.percentage() {
        Some(percentage) => {
            let filled = ((percentage / 100.0) * BAR_WIDTH as f64) as usize;
            let bar = "#".repeat(filled) + &" ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH));
            format!(
                "\r{}: [{}] {:.1}% ({}) {}",
                progress.name,
                bar,
                percentage,
                format_bytes(progress.transferred_bytes),
                format_speed(progress.speed_bps())
            )
        }
        None => format!(
            "\r{}: {} {}",
            progress.name,
            format_bytes(progress.transferred_bytes),
            format_speed(progress.speed_bps())
        ),
    };
    print!("{}", line);

    if let Err(e) = io::stdout().flush() {
        eprintln!("\nError flushing stdout: {}", e);
    }
}

/// Print the summary and move to the next line
pub fn finish_progress(progress: &TransferProgress) {
    println!(
        "\r{}: {} in {:.1}s ({})",
        progress.name,
        format_bytes(progress.transferred_bytes),
        progress.elapsed().as_secs_f64(),
        format_speed(progress.speed_bps())
    );
}

/// Format bytes as human readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format speed as human readable string
pub fn format_speed(bps: f64) -> String {
    format!("{}/s", format_bytes(bps as u64))
}

/// Progress sink printing to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn update(&self, progress: &TransferProgress) {
        display_progress(progress);
    }

    fn finish(&self, progress: &TransferProgress) {
        finish_progress(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(1024.0), "1.0 KB/s");
    }
}
