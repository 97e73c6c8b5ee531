use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::common::SchedulingError;

/// Resolves a stored wall-clock start time to the UTC instant it names in the
/// given timezone. DST folds pick the earlier instant; DST gaps are an error
/// because the wall time never occurs.
pub(super) fn resolve_start(
    start: NaiveDateTime,
    timezone: Tz,
) -> Result<DateTime<Utc>, SchedulingError> {
    match timezone.from_local_datetime(&start) {
        LocalResult::Single(resolved) => Ok(resolved.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, latest) => {
            log::warn!(
                "Start time {} is ambiguous in {}; using the earlier instant. [earliest = {}, latest = {}]",
                start,
                timezone,
                earliest,
                latest
            );
            Ok(earliest.with_timezone(&Utc))
        }
        LocalResult::None => Err(SchedulingError::UnresolvableStartTime { start, timezone }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    use super::*;

    fn wall_time(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn sast_wall_time_is_two_hours_ahead_of_utc() {
        // South Africa has no DST, so the correction is a constant two hours
        // year round. This is the legacy hardcoded offset, derived properly.
        let resolved =
            resolve_start(wall_time(2025, 6, 1, 10, 0), chrono_tz::Africa::Johannesburg).unwrap();

        assert_eq!(resolved.naive_utc(), wall_time(2025, 6, 1, 8, 0));

        let midwinter =
            resolve_start(wall_time(2025, 1, 1, 10, 0), chrono_tz::Africa::Johannesburg).unwrap();
        assert_eq!(midwinter.naive_utc(), wall_time(2025, 1, 1, 8, 0));
    }

    #[test]
    fn dst_gap_is_rejected() {
        // 2025-03-30 02:30 never happens in Berlin; clocks jump 02:00 -> 03:00.
        let err = resolve_start(wall_time(2025, 3, 30, 2, 30), chrono_tz::Europe::Berlin)
            .unwrap_err();

        assert!(matches!(
            err,
            SchedulingError::UnresolvableStartTime { .. }
        ));
    }

    #[test]
    fn dst_fold_uses_the_earlier_instant() {
        // 2025-10-26 02:30 happens twice in Berlin; the first pass is +02:00.
        let resolved =
            resolve_start(wall_time(2025, 10, 26, 2, 30), chrono_tz::Europe::Berlin).unwrap();

        assert_eq!(resolved.naive_utc(), wall_time(2025, 10, 26, 0, 30));
    }

    proptest! {
        #[test]
        fn utc_resolution_is_identity(start in arb::<NaiveDateTime>()) {
            let start = start.with_nanosecond(0).unwrap();
            let resolved = resolve_start(start, chrono_tz::UTC).unwrap();

            prop_assert_eq!(resolved.naive_utc(), start);
        }
    }
}
