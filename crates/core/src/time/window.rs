use crate::domain::query::PeriodPhrase;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const LAST_MONTH_DAYS: i64 = 30;
const LAST_3_MONTHS_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `None` unless `start <= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The window widened by `days` on both sides.
    pub fn padded(&self, days: i64) -> Self {
        Self {
            start: self.start - Duration::days(days),
            end: self.end + Duration::days(days),
        }
    }
}

/// Resolves a period phrase to a calendar window anchored on `today`. Recomputed per call.
pub fn resolve(phrase: PeriodPhrase, today: NaiveDate) -> DateWindow {
    match phrase {
        PeriodPhrase::LastMonth => DateWindow {
            start: today - Duration::days(LAST_MONTH_DAYS),
            end: today,
        },
        PeriodPhrase::Last3Months => DateWindow {
            start: today - Duration::days(LAST_3_MONTHS_DAYS),
            end: today,
        },
        PeriodPhrase::Ytd => DateWindow {
            start: first_of_year(today),
            end: today,
        },
        PeriodPhrase::LastQuarter => last_completed_quarter(today),
    }
}

/// The most recent calendar quarter whose last day is strictly before `today`.
pub fn last_completed_quarter(today: NaiveDate) -> DateWindow {
    // The day before the current quarter starts is the latest quarter-end < today, even when
    // today is itself a quarter-end.
    let end = quarter_start(today) - Duration::days(1);
    DateWindow {
        start: quarter_start(end),
        end,
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d - Duration::days(i64::from(d.day0()))
}

fn first_of_year(d: NaiveDate) -> NaiveDate {
    d - Duration::days(i64::from(d.ordinal0()))
}

fn quarter_start(d: NaiveDate) -> NaiveDate {
    let mut start = first_of_month(d);
    for _ in 0..(d.month0() % 3) {
        start = first_of_month(start - Duration::days(1));
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn last_quarter_rolls_back_across_year_boundary() {
        let w = resolve(PeriodPhrase::LastQuarter, d(2024, 2, 15));
        assert_eq!(w.start, d(2023, 10, 1));
        assert_eq!(w.end, d(2023, 12, 31));
    }

    #[test]
    fn last_quarter_handles_each_quarter_end() {
        assert_eq!(
            resolve(PeriodPhrase::LastQuarter, d(2024, 5, 2)),
            DateWindow { start: d(2024, 1, 1), end: d(2024, 3, 31) }
        );
        assert_eq!(
            resolve(PeriodPhrase::LastQuarter, d(2024, 8, 20)),
            DateWindow { start: d(2024, 4, 1), end: d(2024, 6, 30) }
        );
        assert_eq!(
            resolve(PeriodPhrase::LastQuarter, d(2024, 11, 30)),
            DateWindow { start: d(2024, 7, 1), end: d(2024, 9, 30) }
        );
    }

    #[test]
    fn last_quarter_is_stable_within_a_quarter() {
        let expected = DateWindow { start: d(2023, 10, 1), end: d(2023, 12, 31) };
        let mut day = d(2024, 1, 1);
        while day <= d(2024, 3, 31) {
            let w = resolve(PeriodPhrase::LastQuarter, day);
            assert_eq!(w, expected, "resolved on {day}");
            assert!(w.end < day);
            day += Duration::days(1);
        }
    }

    #[test]
    fn quarter_end_itself_is_not_completed_yet() {
        // Strictly before: on Jun 30 the latest completed quarter is still Q1.
        let w = resolve(PeriodPhrase::LastQuarter, d(2024, 6, 30));
        assert_eq!(w.end, d(2024, 3, 31));
        let w = resolve(PeriodPhrase::LastQuarter, d(2024, 7, 1));
        assert_eq!(w.end, d(2024, 6, 30));
        assert_eq!(w.start, d(2024, 4, 1));
    }

    #[test]
    fn leap_year_february_is_inside_q1() {
        let w = resolve(PeriodPhrase::LastQuarter, d(2024, 4, 1));
        assert_eq!(w.start, d(2024, 1, 1));
        assert_eq!(w.end, d(2024, 3, 31));
        assert_eq!((w.end - w.start).num_days(), 90);
        let w = resolve(PeriodPhrase::LastQuarter, d(2023, 4, 1));
        assert_eq!((w.end - w.start).num_days(), 89);
    }

    #[test]
    fn rolling_windows_count_calendar_days() {
        let today = d(2024, 3, 1);
        let w = resolve(PeriodPhrase::LastMonth, today);
        assert_eq!(w.start, d(2024, 1, 31));
        assert_eq!(w.end, today);
        let w = resolve(PeriodPhrase::Last3Months, today);
        assert_eq!(w.start, d(2023, 12, 2));
        assert_eq!(w.end, today);
    }

    #[test]
    fn ytd_on_new_years_day_is_a_single_day() {
        let w = resolve(PeriodPhrase::Ytd, d(2025, 1, 1));
        assert_eq!(w.start, d(2025, 1, 1));
        assert_eq!(w.end, d(2025, 1, 1));
        let w = resolve(PeriodPhrase::Ytd, d(2024, 12, 31));
        assert_eq!(w.start, d(2024, 1, 1));
    }

    #[test]
    fn start_never_after_end() {
        let mut day = d(2023, 12, 1);
        while day <= d(2025, 3, 1) {
            for phrase in PeriodPhrase::ALL {
                let w = resolve(phrase, day);
                assert!(w.start <= w.end, "{phrase} on {day}");
            }
            day += Duration::days(3);
        }
    }

    #[test]
    fn padded_widens_both_sides() {
        let w = DateWindow::new(d(2024, 1, 1), d(2024, 3, 31)).unwrap().padded(7);
        assert_eq!(w.start, d(2023, 12, 25));
        assert_eq!(w.end, d(2024, 4, 7));
        assert!(DateWindow::new(d(2024, 2, 1), d(2024, 1, 1)).is_none());
    }
}
