use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch. Clamps to 0 for clocks set before 1970.
pub fn get_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
