//! Due-time arithmetic for recurring jobs

use crate::scheduler::ScheduleType;
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Parses a "HH:MM" time of day
pub fn parse_schedule_time(s: &str) -> Option<NaiveTime> {
    let (hours, minutes) = s.trim().split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Interval between runs, None for manual jobs
pub fn period(schedule_type: ScheduleType) -> Option<Duration> {
    match schedule_type {
        ScheduleType::Manual => None,
        ScheduleType::Hourly => Some(Duration::hours(1)),
        ScheduleType::Daily => Some(Duration::days(1)),
        ScheduleType::Weekly => Some(Duration::weeks(1)),
    }
}

/// First due time of a job created at `created_at`
///
/// Hourly jobs are first due an hour after creation. Daily and weekly jobs are
/// first due at the next occurrence of `time` strictly after creation.
pub fn first_due(
    schedule_type: ScheduleType,
    time: NaiveTime,
    created_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match schedule_type {
        ScheduleType::Manual => None,
        ScheduleType::Hourly => Some(created_at + Duration::hours(1)),
        ScheduleType::Daily | ScheduleType::Weekly => {
            let today = created_at.date_naive().and_time(time).and_utc();
            if today > created_at {
                Some(today)
            } else {
                Some(today + Duration::days(1))
            }
        }
    }
}

/// Moves a due time forward by whole periods until it is after `now`
///
/// Windows missed while the process was down are skipped, not replayed.
pub fn advance(due: DateTime<Utc>, period: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    if due > now {
        return due;
    }
    let period_secs = period.num_seconds().max(1);
    let behind = (now - due).num_seconds();
    let steps = behind / period_secs + 1;
    due + Duration::seconds(steps * period_secs)
}
