//! Formatting helpers for the terminal front end: byte sizes, durations, round
//! progress and averages.

use std::time::Duration;

/// Formats a byte count with a binary unit, e.g. `512 B` or `1.50 KB`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.2} {unit}")
}

/// Formats an elapsed time as tenths of a second under a minute, then as
/// minutes and seconds: `0.4s`, `12.0s`, `3m 07s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}.{}s", d.subsec_millis() / 100)
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// "Round 2/5".
#[must_use]
pub fn format_round(round: u32, total: u32) -> String {
    format!("Round {round}/{total}")
}

/// A fixed-width bar of completed rounds, e.g. `[■■□□□]`.
#[must_use]
pub fn format_progress(done: u32, total: u32) -> String {
    let done = done.min(total) as usize;
    let left = total as usize - done;
    format!("[{}{}]", "■".repeat(done), "□".repeat(left))
}

/// One decimal place, as shown for average points.
#[must_use]
pub fn format_average(value: f64) -> String {
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
        assert_eq!(format_duration(Duration::from_millis(500)), "0.5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "61m 05s");
    }

    #[test]
    fn round_and_progress() {
        assert_eq!(format_round(2, 5), "Round 2/5");
        assert_eq!(format_progress(0, 3), "[□□□]");
        assert_eq!(format_progress(2, 5), "[■■□□□]");
        assert_eq!(format_progress(9, 2), "[■■]");
    }

    #[test]
    fn average_has_one_decimal() {
        assert_eq!(format_average(91.666), "91.7");
        assert_eq!(format_average(0.0), "0.0");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_bytes_never_panics(bytes in any::<u64>()) {
                let _ = format_bytes(bytes);
            }

            #[test]
            fn progress_has_one_cell_per_round(done in 0u32..20, total in 0u32..20) {
                let bar = format_progress(done, total);
                prop_assert_eq!(bar.chars().count(), total as usize + 2);
            }
        }
    }
}
