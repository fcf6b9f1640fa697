//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of milliseconds in a second
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration.num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a sample rate into the integer tick period in milliseconds.
///
/// The period is truncated, so 200 Hz gives 5 ms and 300 Hz gives 3 ms.
pub fn period_ms(sample_rate_hz: f64) -> u64 {
    (MILLIS_PER_SECOND as f64 / sample_rate_hz) as u64
}

/// True if the given tick lands on a whole second of elapsed phase time.
pub fn is_1_hz_tick(tick: u64, period_ms: u64) -> bool {
    (tick * period_ms) % MILLIS_PER_SECOND == 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_period_ms() {
        assert_eq!(period_ms(200.0), 5);
        assert_eq!(period_ms(1000.0), 1);
        assert_eq!(period_ms(300.0), 3);
    }

    #[test]
    fn test_is_1_hz_tick() {
        assert!(is_1_hz_tick(0, 5));
        assert!(!is_1_hz_tick(1, 5));
        assert!(is_1_hz_tick(200, 5));
        assert!(is_1_hz_tick(400, 5));
        assert!(!is_1_hz_tick(399, 5));
    }
}
