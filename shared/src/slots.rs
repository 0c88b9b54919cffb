//! Slot conflict detection and free-slot search.
//!
//! Times are minutes since midnight; every interval is half-open
//! `[start, end)`, so a booking ending at 10:00 does not conflict with one
//! starting at 10:00.

use std::collections::BTreeSet;

/// An occupied time range on one field and date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: i32,
    pub end: i32,
}

impl Span {
    pub fn new(start_minutes: i32, duration_minutes: i32) -> Self {
        Span {
            start: start_minutes,
            end: start_minutes + duration_minutes,
        }
    }

    pub fn conflicts_with(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

pub fn has_conflict(start_minutes: i32, duration_minutes: i32, existing: &[Span]) -> bool {
    let candidate = Span::new(start_minutes, duration_minutes);
    existing.iter().any(|span| candidate.conflicts_with(span))
}

/// How candidate start times are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Walk the fixed step grid from opening time only.
    #[default]
    FixedGrid,
    /// The fixed grid plus the minute each existing booking ends, so a
    /// slot wedged between bookings off the grid is still surfaced.
    GapFill,
}

/// Free start times for a `duration_minutes` booking between `open_minutes`
/// and `close_minutes`. An empty result just means the day is full.
pub fn find_free_slots(
    existing: &[Span],
    open_minutes: i32,
    close_minutes: i32,
    step_minutes: i32,
    duration_minutes: i32,
    mode: SearchMode,
) -> Vec<i32> {
    if step_minutes <= 0 || duration_minutes <= 0 {
        return Vec::new();
    }
    let last_start = close_minutes - duration_minutes;

    let mut candidates = BTreeSet::new();
    let mut start = open_minutes;
    while start <= last_start {
        candidates.insert(start);
        start += step_minutes;
    }
    if mode == SearchMode::GapFill {
        for span in existing {
            if span.end >= open_minutes && span.end <= last_start {
                candidates.insert(span.end);
            }
        }
    }

    candidates
        .into_iter()
        .filter(|&start| !has_conflict(start, duration_minutes, existing))
        .collect()
}

/// Parse a wall-clock `"HH:MM"` into minutes since midnight.
pub fn parse_clock(s: &str) -> Option<i32> {
    let (hours, minutes) = s.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn format_clock(minutes_since_midnight: i32) -> String {
    format!(
        "{:02}:{:02}",
        minutes_since_midnight / 60,
        minutes_since_midnight % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_spans_conflict() {
        assert!(has_conflict(600, 60, &[Span::new(600, 60)]));
    }

    #[test]
    fn touching_spans_do_not_conflict() {
        let existing = [Span::new(600, 60)]; // [600, 660)
        assert!(!has_conflict(660, 60, &existing));
        assert!(!has_conflict(540, 60, &existing));
    }

    #[test]
    fn partial_overlap_conflicts() {
        let existing = [Span::new(600, 60)];
        assert!(has_conflict(630, 60, &existing)); // [630, 690)
        assert!(has_conflict(570, 60, &existing)); // [570, 630)
    }

    #[test]
    fn containment_conflicts() {
        let existing = [Span::new(600, 120)];
        assert!(has_conflict(630, 30, &existing));
    }

    #[test]
    fn empty_day_yields_the_whole_grid() {
        let free = find_free_slots(&[], 540, 720, 60, 60, SearchMode::FixedGrid);
        assert_eq!(free, vec![540, 600, 660]);
    }

    #[test]
    fn booked_grid_points_are_skipped() {
        let existing = [Span::new(600, 60)];
        let free = find_free_slots(&existing, 540, 720, 60, 60, SearchMode::FixedGrid);
        assert_eq!(free, vec![540, 660]);
    }

    #[test]
    fn full_day_yields_nothing() {
        let existing = [Span::new(540, 180)];
        let free = find_free_slots(&existing, 540, 720, 60, 60, SearchMode::FixedGrid);
        assert!(free.is_empty());
    }

    #[test]
    fn duration_must_fit_before_closing() {
        let free = find_free_slots(&[], 540, 720, 60, 120, SearchMode::FixedGrid);
        assert_eq!(free, vec![540, 600]);
    }

    #[test]
    fn gap_fill_surfaces_off_grid_starts() {
        // [545, 605) blocks both 540 and 600 on the hourly grid; the grid
        // alone only finds 660, gap-fill also finds 605.
        let existing = [Span::new(545, 60)];
        let grid = find_free_slots(&existing, 540, 720, 60, 60, SearchMode::FixedGrid);
        assert_eq!(grid, vec![660]);
        let filled = find_free_slots(&existing, 540, 720, 60, 60, SearchMode::GapFill);
        assert_eq!(filled, vec![605, 660]);
    }

    #[test]
    fn gap_fill_ignores_ends_too_close_to_closing() {
        let existing = [Span::new(600, 90)]; // ends 690, last start is 660
        let filled = find_free_slots(&existing, 540, 720, 60, 60, SearchMode::GapFill);
        assert_eq!(filled, vec![540]);
    }

    #[test]
    fn nonsense_parameters_yield_nothing() {
        assert!(find_free_slots(&[], 540, 720, 0, 60, SearchMode::FixedGrid).is_empty());
        assert!(find_free_slots(&[], 540, 720, 30, 0, SearchMode::FixedGrid).is_empty());
    }

    #[test]
    fn clock_parsing() {
        assert_eq!(parse_clock("17:31"), Some(17 * 60 + 31));
        assert_eq!(parse_clock("00:00"), Some(0));
        assert_eq!(parse_clock("9:05"), Some(9 * 60 + 5));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("12:60"), None);
        assert_eq!(parse_clock("noon"), None);
        assert_eq!(parse_clock("-1:30"), None);
    }

    #[test]
    fn clock_formatting_round_trips() {
        assert_eq!(format_clock(1051), "17:31");
        assert_eq!(parse_clock(&format_clock(605)), Some(605));
    }
}
