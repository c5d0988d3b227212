//! Calendar normalization helpers. All arithmetic is in UTC.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Zero out minutes, seconds, and sub-second precision.
pub fn floor_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), t.hour(), 0, 0)
        .single()
        .expect("hour floor of a valid UTC instant")
}

/// First instant of `t`'s UTC month.
pub fn floor_to_month(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0)
        .single()
        .expect("month floor of a valid UTC instant")
}

/// Calendar month arithmetic with year rollover in both directions.
///
/// The day and time-of-day are carried as-is. Precondition: `t`'s day must
/// exist in the target month; callers only pass month boundaries, so no
/// clamping is performed.
pub fn add_months(t: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let total = t.year() * 12 + t.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    Utc.with_ymd_and_hms(year, month, t.day(), t.hour(), t.minute(), t.second())
        .single()
        .and_then(|d| d.with_nanosecond(t.nanosecond()))
        .expect("day-of-month valid in target month")
}
