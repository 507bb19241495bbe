//! Table formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};

use cfs_gen_runtime::{HistoryEntry, PipelineReport};

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// One row per converted layer, in ordinal order.
pub fn summary_table(report: &PipelineReport) -> Table {
    let mut table = new_table(&["ORDINAL", "LAYER ID", "SOURCE", "OUTPUT"]);
    for result in &report.conversions {
        let layer = &result.descriptor;
        table.add_row([
            layer.ordinal.to_string(),
            truncate_str(&layer.layer_id, 24),
            layer.source_dir.display().to_string(),
            format!("{} -> /{}", layer.file_name(), layer.ordinal_file_name()),
        ]);
    }
    table
}

pub fn print_summary(report: &PipelineReport) {
    println!("{}", summary_table(report));
    if report.workdir_removed {
        println!("Working directory {} removed", report.workdir.display());
    } else {
        println!("Working directory: {}", report.workdir.display());
    }
}

/// Build history, oldest entry first.
pub fn history_table(history: &[HistoryEntry]) -> Table {
    let mut table = new_table(&["CREATED", "CREATED BY", "SIZE", "COMMENT"]);
    for entry in history {
        let created = match &entry.created {
            Some(ts) => format_timestamp(ts),
            None => "<unknown>".to_string(),
        };
        table.add_row([
            created,
            truncate_str(&entry.created_by, 60),
            format_bytes(entry.size),
            entry.comment.clone(),
        ]);
    }
    table
}

pub fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        println!("No build history available");
        return;
    }
    println!("{}", history_table(history));
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a chrono timestamp as a relative "ago" string.
pub fn format_ago(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let duration = now.signed_duration_since(*dt);

    let secs = duration.num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }

    if secs < 60 {
        return format!("{secs} seconds ago");
    }

    let mins = duration.num_minutes();
    if mins < 60 {
        return format!("{mins} minutes ago");
    }

    let hours = duration.num_hours();
    if hours < 24 {
        return format!("{hours} hours ago");
    }

    let days = duration.num_days();
    if days < 30 {
        return format!("{days} days ago");
    }

    let months = days / 30;
    if months < 12 {
        return format!("{months} months ago");
    }

    let years = days / 365;
    format!("{years} years ago")
}

fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| format_ago(&dt.with_timezone(&chrono::Utc)))
        .unwrap_or_else(|_| ts.to_string())
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use cfs_gen_core::{ConversionResult, ImageReference, LayerDescriptor};

    #[test]
    fn test_format_bytes_small() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(10 * 1073741824), "10.0 GB");
    }

    #[test]
    fn test_format_ago_future() {
        let future = chrono::Utc::now() + chrono::Duration::hours(1);
        assert_eq!(format_ago(&future), "just now");
    }

    #[test]
    fn test_format_ago_days() {
        let past = chrono::Utc::now() - chrono::Duration::days(3);
        assert_eq!(format_ago(&past), "3 days ago");
    }

    #[test]
    fn test_format_timestamp_invalid() {
        assert_eq!(format_timestamp("not-a-date"), "not-a-date");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello world", 3), "...");
    }

    #[test]
    fn test_summary_table_rows() {
        let layers: Vec<LayerDescriptor> = ["/a/2/diff", "/a/1/diff"]
            .iter()
            .enumerate()
            .map(|(i, d)| LayerDescriptor::new(*d, i).unwrap())
            .collect();
        let conversions = layers
            .iter()
            .map(|l| ConversionResult {
                descriptor: l.clone(),
                output_file: PathBuf::from("/tmp/ubuntu").join(l.file_name()),
                succeeded: true,
            })
            .collect();
        let report = PipelineReport {
            source: ImageReference::new("ubuntu"),
            output: Some(ImageReference::new("ubuntu-cfs")),
            workdir: PathBuf::from("/tmp/ubuntu"),
            workdir_removed: false,
            layers,
            conversions,
            history: Vec::new(),
            manifest: String::new(),
        };

        let rendered = summary_table(&report).to_string();
        assert!(rendered.contains("2.img -> /0.img"));
        assert!(rendered.contains("1.img -> /1.img"));
    }

    #[test]
    fn test_history_table_unknown_created() {
        let history = vec![HistoryEntry {
            created_by: "ADD rootfs /".to_string(),
            size: 2048,
            ..Default::default()
        }];
        let rendered = history_table(&history).to_string();
        assert!(rendered.contains("<unknown>"));
        assert!(rendered.contains("2.0 KB"));
    }
}
