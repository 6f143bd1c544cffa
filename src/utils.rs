//! Small formatting helpers shared by the recorder and the library

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte count using 1024-based units.
///
/// At most two decimals are kept and trailing zeros are dropped, so 1536
/// bytes reads "1.5 KB" and 1024 reads "1 KB".
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Format whole seconds as zero-padded `MM:SS`
pub fn format_mm_ss(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
