//! Wall-clock helpers. All persisted timestamps are epoch milliseconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Converts a system time to epoch milliseconds. Pre-epoch times map to negatives.
pub fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    epoch_millis(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::epoch_millis;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn epoch_millis_truncates_sub_millisecond_part() {
        let time = UNIX_EPOCH + Duration::from_micros(1_500);
        assert_eq!(epoch_millis(time), 1);
    }

    #[test]
    fn epoch_millis_handles_pre_epoch_times() {
        let time = UNIX_EPOCH - Duration::from_millis(20);
        assert_eq!(epoch_millis(time), -20);
    }
}
