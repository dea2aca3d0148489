//! Human-readable byte sizes for diagnostics.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format `bytes` as `<n><unit>`, dividing by 1024 (rounding down) until
/// the value is below 1024 or the unit is TB.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024 && unit < UNITS.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    format!("{value}{}", UNITS[unit])
}
