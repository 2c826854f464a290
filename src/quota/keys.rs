//! Store key derivation.

use chrono::{DateTime, Utc};

/// Key for the window counter of the UTC calendar minute containing `at`.
///
/// Two timestamps in the same UTC minute yield the same key; timestamps
/// in adjacent minutes yield different keys even when milliseconds apart.
/// That boundary is what makes this a fixed-window limiter: a client can
/// be admitted at the end of one minute and again at the start of the
/// next.
pub fn window_key(client_id: &str, at: DateTime<Utc>) -> String {
    format!("corn:window:{}:{}", client_id, at.format("%Y%m%d%H%M"))
}

/// Key for a client's lifetime total, independent of time.
pub fn total_key(client_id: &str) -> String {
    format!("corn:total:{}", client_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_key_stable_within_minute() {
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 59).unwrap();

        assert_eq!(window_key("alice", t1), window_key("alice", t2));
    }

    #[test]
    fn test_window_key_changes_across_minute_boundary() {
        // One millisecond before and after the boundary.
        let t1 = Utc.timestamp_millis_opt(1_714_567_259_999).unwrap();
        let t2 = Utc.timestamp_millis_opt(1_714_567_260_001).unwrap();

        assert_ne!(window_key("alice", t1), window_key("alice", t2));
    }

    #[test]
    fn test_window_key_differs_per_client() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 0).unwrap();

        assert_ne!(window_key("alice", t), window_key("bob", t));
    }

    #[test]
    fn test_window_key_format() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56).unwrap();

        assert_eq!(window_key("alice", t), "corn:window:alice:202405011234");
    }

    #[test]
    fn test_total_key_is_time_independent() {
        assert_eq!(total_key("alice"), "corn:total:alice");
    }
}
