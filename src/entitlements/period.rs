//! Tenant-local time windows for usage aggregation.
//!
//! Daily message counts reset at the tenant's local midnight and monthly
//! lookup counts at the first of the tenant's local month, purely through
//! date filters on the aggregate queries.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a tenant's stored timezone, falling back to UTC on anything
/// unrecognized.
pub fn tenant_tz(name: &str) -> Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Half-open UTC bounds of the tenant-local calendar day containing `now`.
pub fn day_bounds(tz: Tz, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&tz).date_naive();
    (local_midnight(tz, today), local_midnight(tz, today + Duration::days(1)))
}

/// UTC instant of the first tenant-local midnight of the month containing `now`.
pub fn month_start(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&tz).date_naive();
    let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1).unwrap_or(local);
    local_midnight(tz, first)
}

/// Resolve local midnight on `date` to a UTC instant. Midnight can be
/// skipped or repeated on DST transition days; skipped midnights shift
/// forward an hour at a time, repeated ones take the earlier reading.
fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    for hour in 0..3i64 {
        let naive = date.and_time(NaiveTime::MIN) + Duration::hours(hour);
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                return dt.with_timezone(&Utc)
            }
            LocalResult::None => continue,
        }
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(tenant_tz("Mars/Olympus_Mons"), chrono_tz::UTC);
        assert_eq!(tenant_tz("America/Sao_Paulo"), chrono_tz::America::Sao_Paulo);
    }

    #[test]
    fn sao_paulo_day_bounds_are_offset_from_utc() {
        // 2025-06-10 01:00 UTC is still 2025-06-09 22:00 in São Paulo (UTC-3)
        let now = utc("2025-06-10T01:00:00Z");
        let (start, end) = day_bounds(tenant_tz("America/Sao_Paulo"), now);
        assert_eq!(start, utc("2025-06-09T03:00:00Z"));
        assert_eq!(end, utc("2025-06-10T03:00:00Z"));
    }

    #[test]
    fn utc_day_bounds_cover_twenty_four_hours() {
        let now = utc("2025-06-10T12:30:00Z");
        let (start, end) = day_bounds(chrono_tz::UTC, now);
        assert_eq!(start, utc("2025-06-10T00:00:00Z"));
        assert_eq!(end, utc("2025-06-11T00:00:00Z"));
    }

    #[test]
    fn month_start_is_first_local_midnight() {
        let now = utc("2025-06-15T12:00:00Z");
        let start = month_start(tenant_tz("America/Sao_Paulo"), now);
        assert_eq!(start, utc("2025-06-01T03:00:00Z"));
    }

    #[test]
    fn month_boundary_respects_local_date() {
        // 2025-07-01 01:00 UTC is still June 30th in São Paulo, so the month
        // window must anchor on June 1st.
        let now = utc("2025-07-01T01:00:00Z");
        let start = month_start(tenant_tz("America/Sao_Paulo"), now);
        assert_eq!(start, utc("2025-06-01T03:00:00Z"));
    }
}
