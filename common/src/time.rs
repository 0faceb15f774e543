//! Time utilities for coupon records.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Milliseconds since the Unix epoch, used when deriving display codes.
pub fn unix_millis(timestamp: Timestamp) -> i64 {
    timestamp.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unix_millis() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(unix_millis(ts), 1_700_000_000_123);
    }

    #[test]
    fn test_now_is_monotonic_enough() {
        let a = now();
        let b = now();
        assert!(b >= a);
    }
}
