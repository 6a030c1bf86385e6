//! Sync branch naming.
//!
//! Each sync attempt pushes its result on a fresh branch named after the
//! target branch and the current minute, plus a short random suffix so
//! that two runs starting within the same minute cannot collide.

use chrono::{DateTime, Utc};

/// Timestamp format baked into sync branch names (minute granularity,
/// 12 digits).
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Build a sync branch name from its parts. Pure function of its inputs;
/// the branch name is interpolated as-is, so an illegal ref name surfaces
/// at the push step, not here.
pub fn sync_branch_name(branch: &str, now: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "sync-upstream-{}-{}-{}",
        branch,
        now.format(TIMESTAMP_FORMAT),
        suffix
    )
}

/// Generate a fresh sync branch name for `branch` from the current UTC
/// time and a random 4-hex suffix.
pub fn generate(branch: &str) -> String {
    let suffix: u16 = rand::random();
    sync_branch_name(branch, Utc::now(), &format!("{:04x}", suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_name_shape() {
        let now = Utc.with_ymd_and_hms(2025, 8, 7, 12, 34, 56).unwrap();
        let name = sync_branch_name("main", now, "1a2b");
        assert_eq!(name, "sync-upstream-main-202508071234-1a2b");
    }

    #[test]
    fn test_timestamp_is_twelve_digits_minute_precision() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 59).unwrap();
        let name = sync_branch_name("dev", now, "0000");
        let timestamp = name
            .strip_prefix("sync-upstream-dev-")
            .and_then(|rest| rest.strip_suffix("-0000"))
            .unwrap();
        assert_eq!(timestamp.len(), 12);
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        // Seconds are not encoded.
        assert_eq!(timestamp, "202501020304");
    }

    #[test]
    fn test_distinct_across_branch_and_minute() {
        let t1 = Utc.with_ymd_and_hms(2025, 8, 7, 12, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 8, 7, 12, 1, 0).unwrap();
        assert_ne!(
            sync_branch_name("main", t1, "aaaa"),
            sync_branch_name("dev", t1, "aaaa")
        );
        assert_ne!(
            sync_branch_name("main", t1, "aaaa"),
            sync_branch_name("main", t2, "aaaa")
        );
    }

    #[test]
    fn test_branch_with_slash_is_interpolated_verbatim() {
        let now = Utc.with_ymd_and_hms(2025, 8, 7, 12, 0, 0).unwrap();
        let name = sync_branch_name("release/1.0", now, "beef");
        assert_eq!(name, "sync-upstream-release/1.0-202508071200-beef");
    }

    #[test]
    fn test_generate_appends_four_hex_suffix() {
        let name = generate("main");
        let suffix = name.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
