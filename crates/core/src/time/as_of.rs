use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone};

/// The date windows are anchored on. An explicit `YYYY-MM-DD` argument wins; otherwise the
/// calendar date of `now` in its own time zone.
pub fn resolve_today<Tz: TimeZone>(
    as_of_date_arg: Option<&str>,
    now: DateTime<Tz>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = as_of_date_arg {
        return NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid as-of date {s:?}, expected YYYY-MM-DD"));
    }

    Ok(now.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn explicit_argument_wins() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let d = resolve_today(Some("2024-02-15"), now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
    }

    #[test]
    fn uses_date_in_callers_zone() {
        // 2026-01-05 20:00 UTC is already 2026-01-06 in IST (+05:30).
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = Utc
            .with_ymd_and_hms(2026, 1, 5, 20, 0, 0)
            .unwrap()
            .with_timezone(&ist);
        let d = resolve_today(None, now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
    }

    #[test]
    fn rejects_malformed_argument() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        assert!(resolve_today(Some("15/02/2024"), now).is_err());
    }
}
