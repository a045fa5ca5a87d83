use std::time::Duration;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Binary-prefixed size, two decimals above one KiB.
pub fn human_bytes(bytes: f64) -> String {
    let mut value = bytes.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} {}", value, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// One tick of traffic against the bandwidth ceiling, for trace output.
///
/// The load is per tick, the same way the network needle reads it, so it
/// may exceed 100 where the needle pins.
pub fn describe_traffic(bytes: u64, interval: Duration, max_bandwidth: u64) -> String {
    let load = if max_bandwidth == 0 {
        0.0
    } else {
        bytes as f64 / max_bandwidth as f64 * 100.0
    };
    let secs = interval.as_secs_f64();
    if secs == 0.0 {
        return format!("{} ({:.1}% load)", human_bytes(bytes as f64), load);
    }
    format!(
        "{} at {}/s ({:.1}% load)",
        human_bytes(bytes as f64),
        human_bytes(bytes as f64 / secs),
        load
    )
}
