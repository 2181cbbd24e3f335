//! Next-execution computation.
//!
//! Pure, timezone-aware occurrence math shared by schedule creation and
//! validation. All functions return instants strictly after the reference
//! time, in UTC.
//!
//! Local times that a DST transition makes ambiguous resolve to the earliest
//! mapping; local times a spring-forward gap removes entirely roll to the
//! next candidate. Month-anchored frequencies clamp `day_of_month` to the
//! last day of short months (day 31 fires on Feb 28/29, Apr 30, ...).

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;

use crate::error::{MeridianError, Result};
use crate::scheduling::schedule::{Frequency, ScheduleConfig};

/// Parse an IANA timezone identifier.
pub fn parse_timezone(timezone: &str) -> Result<Tz> {
    timezone.parse::<Tz>().map_err(|_| {
        MeridianError::validation(
            "timezone",
            format!("unrecognized timezone: {}", timezone),
        )
    })
}

/// The earliest occurrence of `config` strictly after `after`.
pub fn next_occurrence(config: &ScheduleConfig, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let tz = parse_timezone(&config.timezone)?;
    let time = NaiveTime::from_hms_opt(u32::from(config.hour), u32::from(config.minute), 0)
        .ok_or_else(|| {
            MeridianError::validation("hour", "hour/minute out of range")
        })?;
    let local_after = after.with_timezone(&tz);

    match config.frequency {
        Frequency::Hourly => {
            let minute_only =
                NaiveTime::from_hms_opt(0, u32::from(config.minute), 0).ok_or_else(|| {
                    MeridianError::validation("minute", "minute out of range")
                })?;
            let mut candidate = local_after
                .date_naive()
                .and_time(minute_only)
                + Duration::hours(i64::from(local_after.time().hour()));
            loop {
                if let Some(resolved) = resolve_local(candidate, tz) {
                    if resolved > after {
                        return Ok(resolved);
                    }
                }
                candidate += Duration::hours(1);
            }
        }
        Frequency::Daily => {
            let mut date = local_after.date_naive();
            loop {
                if let Some(resolved) = resolve_local(date.and_time(time), tz) {
                    if resolved > after {
                        return Ok(resolved);
                    }
                }
                date = next_day(date)?;
            }
        }
        Frequency::Weekly => {
            // Weekly without an explicit day defaults to Monday.
            let target = u32::from(config.day_of_week.unwrap_or(1)) % 7;
            let current = local_after.date_naive().weekday().num_days_from_sunday();
            let ahead = (i64::from(target) - i64::from(current)).rem_euclid(7);
            let mut date = local_after.date_naive() + Duration::days(ahead);
            loop {
                if let Some(resolved) = resolve_local(date.and_time(time), tz) {
                    if resolved > after {
                        return Ok(resolved);
                    }
                }
                date += Duration::days(7);
            }
        }
        Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => {
            let stride = config
                .frequency
                .month_stride()
                .expect("month-anchored frequency");
            let day = u32::from(config.day_of_month.unwrap_or(1));
            let mut year = local_after.year();
            let mut month = local_after.month();
            loop {
                let clamped = day.min(last_day_of_month(year, month));
                let date = NaiveDate::from_ymd_opt(year, month, clamped).ok_or_else(|| {
                    MeridianError::validation("day_of_month", "day of month out of range")
                })?;
                if let Some(resolved) = resolve_local(date.and_time(time), tz) {
                    if resolved > after {
                        return Ok(resolved);
                    }
                }
                (year, month) = add_months(year, month, stride);
            }
        }
    }
}

/// The next `count` occurrences, strictly increasing.
pub fn next_occurrences(
    config: &ScheduleConfig,
    after: DateTime<Utc>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>> {
    let mut occurrences = Vec::with_capacity(count);
    let mut cursor = after;
    for _ in 0..count {
        let next = next_occurrence(config, cursor)?;
        occurrences.push(next);
        cursor = next;
    }
    Ok(occurrences)
}

/// Map a local wall-clock time into UTC, handling DST transitions.
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| MeridianError::internal("date overflow computing next occurrence"))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

fn add_months(year: i32, month: u32, stride: u32) -> (i32, u32) {
    let zero_based = month - 1 + stride;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
