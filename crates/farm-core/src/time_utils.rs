use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{FarmError, Result};
use crate::store::TimeRange;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a configured timezone name into a [`Tz`].
///
/// `"auto"` resolves to the system timezone, falling back to UTC with a
/// warning when the system reports a name chrono-tz does not know. Any other
/// unknown name is a configuration error.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    if name.eq_ignore_ascii_case("auto") {
        let system = get_system_timezone();
        return Ok(system.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "unrecognised system timezone \"{}\", falling back to UTC",
                system
            );
            Tz::UTC
        }));
    }
    name.parse::<Tz>()
        .map_err(|_| FarmError::Config(format!("unknown timezone {}", name)))
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── Calendar dates ────────────────────────────────────────────────────────────

/// Parse a report date given as `YYYY-MM-DD`.
pub fn parse_report_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        FarmError::InvalidArgument(format!("invalid date '{}': expected YYYY-MM-DD", s))
    })
}

/// Calendar date of `instant` as seen in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The half-open UTC range covering local calendar day `date` in `tz`.
///
/// Handles DST days of 23 or 25 hours. When local midnight does not exist
/// the day starts at the first instant after the gap.
pub fn day_range(date: NaiveDate, tz: Tz) -> TimeRange {
    let start = local_midnight(date, tz);
    let end = date
        .succ_opt()
        .map(|next| local_midnight(next, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeRange { start, end }
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        // Midnight falls in a DST gap; skip forward an hour.
        None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

// ── Timestamps ────────────────────────────────────────────────────────────────

/// Parse a measurement timestamp.
///
/// Accepts RFC 3339 (with `Z` or an offset), naive date-times which are
/// interpreted in `tz`, and bare dates (local midnight).
pub fn parse_timestamp(s: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const FMTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FMTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
                return Ok(dt.with_timezone(&Utc));
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(local_midnight(date, tz));
    }

    Err(FarmError::InvalidArgument(format!(
        "invalid timestamp '{}'",
        s
    )))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
