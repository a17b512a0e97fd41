use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Fixed epoch the numeric date encoding is measured against.
///
/// Chosen to match the common "days since year zero" convention used by plotting/serialization
/// layers upstream of this engine; the exact epoch is arbitrary as long as it is fixed and
/// consistently applied.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).expect("fixed epoch is always valid")
}

/// A point in time encoded as days-since-[`epoch`] with a fractional part encoding
/// seconds-since-midnight, to microsecond precision.
///
/// `f64::NEG_INFINITY` means "none"; `f64::INFINITY` means "max" (used by the engine to detect
/// an exhausted feed during vectorized peeks).
pub type NumericDate = f64;

/// Sentinel for "no value" in a [`NumericDate`] line.
pub const NONE: NumericDate = f64::NEG_INFINITY;

/// Sentinel for "beyond the end of all data" in a [`NumericDate`] line.
pub const MAX: NumericDate = f64::INFINITY;

/// Encode a [`DateTime<Utc>`] as a [`NumericDate`].
pub fn encode(dt: DateTime<Utc>) -> NumericDate {
    let naive = dt.naive_utc();
    encode_naive(naive)
}

/// Encode a [`NaiveDateTime`] as a [`NumericDate`].
pub fn encode_naive(dt: NaiveDateTime) -> NumericDate {
    let days = (dt.date() - epoch()).num_days() as f64;
    let seconds_since_midnight = dt.time().num_seconds_from_midnight() as f64
        + dt.time().nanosecond() as f64 / 1_000_000_000.0;
    days + seconds_since_midnight / 86_400.0
}

/// Decode a [`NumericDate`] back into a [`NaiveDateTime`].
///
/// Returns `None` for the [`NONE`]/[`MAX`] sentinels, since those do not represent a real
/// instant.
pub fn decode(value: NumericDate) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let days = value.floor();
    let frac_seconds = (value - days) * 86_400.0;
    let date = epoch() + Duration::days(days as i64);
    let naive_time = date.and_hms_opt(0, 0, 0)?;
    Some(naive_time + Duration::microseconds((frac_seconds * 1_000_000.0).round() as i64))
}
