//! Calendar-day boundaries for the live and history views.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, Utc};

/// Returns the first and last millisecond of the calendar day containing
/// `now`, where the day is reckoned in `offset` and returned in UTC.
#[must_use]
pub fn day_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = now
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);
    let start =
        (local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc();
    let end = start + TimeDelta::days(1) - TimeDelta::milliseconds(1);
    (start, end)
}
