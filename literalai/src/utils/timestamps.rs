//! Timestamp utilities.

use chrono::{DateTime, Utc};

/// Timestamp type used by every entity.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_is_monotonic_enough() {
        let first = now_utc();
        let second = now_utc();
        assert!(second >= first);
    }

    #[test]
    fn test_serializes_as_rfc3339() {
        let ts: Timestamp = "2023-10-05T14:30:00Z".parse().unwrap();
        assert_eq!(serde_json::to_value(ts).unwrap(), "2023-10-05T14:30:00Z");
    }
}
