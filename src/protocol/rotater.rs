//! Rotation-bucket bookkeeping for the file protocol (§4.7, invariant 9).
//! A "bucket" is a coarse integer derived from the current time that
//! changes exactly once per rotation period; `update` reports whether the
//! bucket changed since the last call, which is the file protocol's
//! reopen trigger.

use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateMode {
    None,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl RotateMode {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileRotater {
    mode: RotateMode,
    bucket: Option<i64>,
}

impl FileRotater {
    #[must_use]
    pub fn new(mode: RotateMode) -> Self {
        Self { mode, bucket: None }
    }

    #[must_use]
    pub fn mode(&self) -> RotateMode {
        self.mode
    }

    /// Records `now`'s bucket and returns `true` once the bucket differs
    /// from the previously recorded one. The first call after construction
    /// never triggers a rotation: there is no prior file to close yet.
    pub fn update(&mut self, now: OffsetDateTime) -> bool {
        if self.mode == RotateMode::None {
            return false;
        }
        let bucket = Self::bucket_for(self.mode, now);
        match self.bucket.replace(bucket) {
            None => false,
            Some(prev) => prev != bucket,
        }
    }

    fn bucket_for(mode: RotateMode, now: OffsetDateTime) -> i64 {
        let days = now.unix_timestamp().div_euclid(86_400);
        match mode {
            RotateMode::None => 0,
            RotateMode::Hourly => now.unix_timestamp().div_euclid(3_600),
            RotateMode::Daily => days,
            RotateMode::Weekly => days.div_euclid(7),
            RotateMode::Monthly => i64::from(now.year()) * 12 + i64::from(u8::from(now.month())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn s4_daily_rotation_across_midnight() {
        let mut r = FileRotater::new(RotateMode::Daily);
        assert!(!r.update(datetime!(2024-01-01 23:59:59 UTC)));
        assert!(r.update(datetime!(2024-01-02 00:00:01 UTC)));
    }

    #[test]
    fn same_bucket_does_not_rotate() {
        let mut r = FileRotater::new(RotateMode::Daily);
        assert!(!r.update(datetime!(2024-01-01 00:00:00 UTC)));
        assert!(!r.update(datetime!(2024-01-01 12:00:00 UTC)));
    }

    #[test]
    fn none_mode_never_rotates() {
        let mut r = FileRotater::new(RotateMode::None);
        assert!(!r.update(datetime!(2024-01-01 00:00:00 UTC)));
        assert!(!r.update(datetime!(2025-01-01 00:00:00 UTC)));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(RotateMode::parse("Daily"), RotateMode::Daily);
        assert_eq!(RotateMode::parse("WEEKLY"), RotateMode::Weekly);
        assert_eq!(RotateMode::parse("nonsense"), RotateMode::None);
    }
}
