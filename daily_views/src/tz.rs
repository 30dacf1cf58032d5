//! The pipeline's single time zone boundary.
//!
//! Every calendar day in this crate is a day in one canonical IANA zone
//! (configured, `UTC` by default). Conversions happen here and only here:
//! - [`day_bounds_utc`]: a canonical day range -> the UTC instants `[start, end)`
//!   used to query the real-time store.
//! - [`local_day`]: a UTC sample timestamp -> the canonical day it belongs to.
//!
//! Notes:
//! - Ambiguous local times happen during “fall back” when a wall time occurs twice.
//! - Nonexistent local times happen during “spring forward” when a wall time is skipped.
//!   A few zones skip midnight itself (e.g. America/Sao_Paulo on 2018-11-04), so
//!   [`from_local_naive`] shifts forward out of gaps and takes the earlier
//!   instant on ambiguity.
//!
//! Examples
//! - New York, 2024-03-10 (23 hours long): 05:00Z .. 2024-03-11T04:00Z
//! - New York “fall back” ambiguity (2024-11-03 01:30 occurs twice): 05:30Z.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use view_sources::models::day_range::DateRange;

/// Parse an IANA zone name such as `"America/New_York"`.
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("bad tz: {name}"))
}

/// Convert a naive local timestamp to UTC in `tz`.
///
/// Behavior:
/// - If the local time maps to a single instant, that instant is returned.
/// - If the local time is ambiguous (fall-back), the earlier instant wins.
/// - If the local time is nonexistent (spring-forward gap), step forward
///   minute-by-minute until a valid instant is found (max 2 hours).
pub fn from_local_naive(naive: NaiveDateTime, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&naive) {
        Single(dt) | Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
        None => {
            let mut t = naive;
            for _ in 0..120 {
                t += chrono::Duration::minutes(1);
                if let Single(dt) = tz.from_local_datetime(&t) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(anyhow::anyhow!("nonexistent local time {naive} in {tz}"))
        }
    }
}

/// UTC instant at which `day` begins in `tz`.
pub fn day_start_utc(day: NaiveDate, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    from_local_naive(day.and_time(NaiveTime::MIN), tz)
}

/// UTC `[start, end)` covering every day of `range` in `tz`.
pub fn day_bounds_utc(
    range: &DateRange,
    tz: Tz,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = day_start_utc(range.start(), tz)?;
    let after_end = range
        .end()
        .succ_opt()
        .context("range end has no following day")?;
    let end = day_start_utc(after_end, tz)?;
    Ok((start, end))
}

/// Canonical calendar day containing the instant `ts`.
pub fn local_day(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parse_tz_accepts_iana_and_rejects_garbage() {
        assert_eq!(parse_tz(" America/New_York ").unwrap(), chrono_tz::America::New_York);
        assert!(parse_tz("Mars/Olympus").is_err());
    }

    #[test]
    fn ny_spring_forward_gap_shifts_to_3am() {
        // 02:30 local does not exist on 2024-03-10; lands at 03:00 EDT = 07:00Z.
        let naive = d(2024, 3, 10).and_hms_opt(2, 30, 0).unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        let got = from_local_naive(naive, tz).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn ny_fall_back_takes_the_earlier_instant() {
        // 2024-11-03 America/New_York 01:30 occurs twice:
        // - 01:30 EDT (UTC-4)  -> 05:30Z  (earlier instant)
        // - 01:30 EST (UTC-5)  -> 06:30Z  (later instant)
        let naive = d(2024, 11, 3).and_hms_opt(1, 30, 0).unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        let got = from_local_naive(naive, tz).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn day_bounds_on_short_and_long_days() {
        let tz = chrono_tz::America::New_York;

        let spring = DateRange::new(d(2024, 3, 10), d(2024, 3, 10)).unwrap();
        let (s, e) = day_bounds_utc(&spring, tz).unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2024, 3, 11, 4, 0, 0).unwrap());
        assert_eq!((e - s).num_hours(), 23);

        let fall = DateRange::new(d(2024, 11, 3), d(2024, 11, 3)).unwrap();
        let (s, e) = day_bounds_utc(&fall, tz).unwrap();
        assert_eq!((e - s).num_hours(), 25);
    }

    #[test]
    fn skipped_midnight_resolves_forward() {
        // Sao Paulo skipped 2018-11-04 00:00..01:00 local (-03 -> -02).
        let tz = chrono_tz::America::Sao_Paulo;
        let start = day_start_utc(d(2018, 11, 4), tz).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2018, 11, 4, 3, 0, 0).unwrap());
    }

    #[test]
    fn local_day_moves_late_utc_samples_back() {
        let tz = chrono_tz::America::New_York;
        let ts = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap(); // 22:00 EST on the 15th
        assert_eq!(local_day(ts, tz), d(2024, 1, 15));
        assert_eq!(local_day(ts, chrono_tz::UTC), d(2024, 1, 16));
    }
}
