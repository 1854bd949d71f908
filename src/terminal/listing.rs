//! Directory listing display functionality

use chrono::Local;

use crate::listing::FileStatus;

/// Kind column of the listing table
fn entry_kind(status: &FileStatus) -> &'static str {
    match (status.cwd_possible, status.retr_possible) {
        (true, _) => "Dir",
        (false, true) => "File",
        _ if status.has_size() => "File",
        _ => "?",
    }
}

/// Format parsed entries as a table
pub fn format_directory_listing(entries: &[FileStatus]) -> String {
    if entries.is_empty() {
        return "Directory is empty.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<30} {:<8} {:<10} {:<20}\n",
        "Name", "Type", "Size", "Modified"
    ));
    output.push_str(&format!("{}\n", "-".repeat(68)));

    for entry in entries {
        let size = if entry.has_size() {
            format_size(entry.size as u64)
        } else {
            "-".to_string()
        };
        let modified = entry
            .modified()
            .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        output.push_str(&format!(
            "{:<30} {:<8} {:<10} {:<20}\n",
            truncate_name(&entry.name, 30),
            entry_kind(entry),
            size,
            modified
        ));
    }

    output
}

/// Truncate long names to fit in column width
fn truncate_name(name: &str, max_width: usize) -> String {
    if name.chars().count() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        let kept: String = name.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    } else {
        name.chars().take(max_width).collect()
    }
}

/// Format file size in human-readable format
fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size_f = size as f64;
    let mut unit_index = 0;

    while size_f >= 1024.0 && unit_index < UNITS.len() - 1 {
        size_f /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size_f, UNITS[unit_index])
    }
}
