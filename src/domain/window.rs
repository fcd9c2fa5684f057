//! Fixed-granularity export windows
//!
//! Windows are hour-aligned, half-open `[start, end)` ranges. For one
//! integration they advance monotonically and never overlap; the pipeline
//! walks them from the checkpoint up to a safety horizon behind "now".

use chrono::{DateTime, Datelike, DurationRound, TimeDelta, Timelike, Utc};

/// Fixed window granularity: one hour.
pub fn granularity() -> TimeDelta {
    TimeDelta::hours(1)
}

/// One half-open export window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// Window of one granularity starting at `start` (must be hour-aligned).
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + granularity(),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The next window in the sequence.
    pub fn next(&self) -> Self {
        Self::starting_at(self.end)
    }

    /// Partition path components for the window start, zero-padded.
    pub fn partition(&self) -> WindowPartition {
        WindowPartition {
            year: self.start.year(),
            month: self.start.month(),
            day: self.start.day(),
            hour: self.start.hour(),
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} -> {})", self.start, self.end)
    }
}

/// Year/month/day/hour components of a window start, for archive keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPartition {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

/// Truncate a timestamp down to the start of its hour.
pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    // duration_trunc only fails on timestamps outside chrono's range
    t.duration_trunc(granularity()).unwrap_or(t)
}

/// Latest window start eligible for processing: the current hour minus one
/// granularity of safety margin against not-yet-flushed upstream data.
/// Windows starting at or after this horizon are left for the next run.
pub fn horizon(now: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_hour(now) - granularity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_truncate_to_hour() {
        let t = ts(2025, 3, 14, 9, 26, 53);
        assert_eq!(truncate_to_hour(t), ts(2025, 3, 14, 9, 0, 0));
        // already aligned
        assert_eq!(
            truncate_to_hour(ts(2025, 3, 14, 9, 0, 0)),
            ts(2025, 3, 14, 9, 0, 0)
        );
    }

    #[test]
    fn test_window_bounds() {
        let w = Window::starting_at(ts(2025, 3, 14, 9, 0, 0));
        assert_eq!(w.start(), ts(2025, 3, 14, 9, 0, 0));
        assert_eq!(w.end(), ts(2025, 3, 14, 10, 0, 0));
        assert!(w.start() < w.end());
    }

    #[test]
    fn test_windows_advance_without_overlap() {
        let w = Window::starting_at(ts(2025, 12, 31, 23, 0, 0));
        let next = w.next();
        assert_eq!(next.start(), w.end());
        assert_eq!(next.end(), ts(2026, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_partition_components() {
        let w = Window::starting_at(ts(2025, 3, 4, 7, 0, 0));
        let p = w.partition();
        assert_eq!((p.year, p.month, p.day, p.hour), (2025, 3, 4, 7));
    }

    #[test]
    fn test_horizon_leaves_one_hour_margin() {
        let now = ts(2025, 6, 1, 12, 40, 10);
        assert_eq!(horizon(now), ts(2025, 6, 1, 11, 0, 0));
        // a window starting exactly at the horizon is not eligible
        let w = Window::starting_at(ts(2025, 6, 1, 11, 0, 0));
        assert!(!(w.start() < horizon(now)));
    }
}
