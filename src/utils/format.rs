//! Human-readable formatting for durations and sizes

/// `"{m}m {s}s"`, seconds rounded to the nearest whole second
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}m {}s", total / 60, total % 60)
}

/// Size in mebibytes with two decimals, e.g. `"1.50 MB"`
pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Percentage with one decimal, e.g. `"66.7%"`; `"0.0%"` when `total` is zero
pub fn format_rate(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}
