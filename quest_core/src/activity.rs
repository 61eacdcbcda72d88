//! Activity windows and streaks.
//!
//! Both evaluations read quest instances through an [`InstanceSource`] and
//! never perform I/O themselves. A source error is returned as-is: a failed
//! read must not look like a day without activity.

use crate::dates::{days_inclusive, CalendarDate};
use crate::{InstanceStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default number of days `compute_streak` looks back
pub const DEFAULT_MAX_LOOKBACK: u32 = 365;

/// Per-day lookup of a quest's instance
pub trait InstanceSource {
    /// The instance materialized on `date`, or `None` if there is none
    fn instance_on(&self, date: CalendarDate) -> Result<Option<InstanceStatus>>;
}

impl<F> InstanceSource for F
where
    F: Fn(CalendarDate) -> Result<Option<InstanceStatus>>,
{
    fn instance_on(&self, date: CalendarDate) -> Result<Option<InstanceStatus>> {
        self(date)
    }
}

impl InstanceSource for HashMap<CalendarDate, InstanceStatus> {
    fn instance_on(&self, date: CalendarDate) -> Result<Option<InstanceStatus>> {
        Ok(self.get(&date).copied())
    }
}

/// One calendar cell: what happened for a quest on a given day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRecord {
    pub date: CalendarDate,
    pub completed: bool,
    pub xp_earned: u32,
}

/// Aggregates over an activity window
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivitySummary {
    pub days: u32,
    pub completed_days: u32,
    pub total_xp: u32,
    /// Completed days over window length, 0.0 for an empty window
    pub completion_rate: f64,
}

/// Dense activity records for every day in `[start, end]`, ascending.
///
/// Days without an instance produce an incomplete record worth no XP.
/// The window is not bounded here; callers pick its length.
pub fn build_activity_window<S>(
    start: CalendarDate,
    end: CalendarDate,
    source: &S,
) -> Result<Vec<ActivityRecord>>
where
    S: InstanceSource + ?Sized,
{
    let mut records = Vec::new();
    for day in days_inclusive(start, end)? {
        let record = match source.instance_on(day)? {
            Some(status) => ActivityRecord {
                date: day,
                completed: status.completed,
                xp_earned: if status.completed { status.xp_reward } else { 0 },
            },
            None => ActivityRecord {
                date: day,
                completed: false,
                xp_earned: 0,
            },
        };
        records.push(record);
    }

    tracing::debug!(
        "Built activity window {}..={} ({} days)",
        start,
        end,
        records.len()
    );
    Ok(records)
}

/// Consecutive completed days ending at `today`.
///
/// Walks backward one day at a time:
/// - a completed instance extends the streak
/// - an instance that was not completed ends it
/// - no instance today is skipped (the day is not over yet)
/// - no instance on an earlier day ends the walk at the edge of known data
///
/// At most `max_lookback` days are examined.
pub fn compute_streak<S>(today: CalendarDate, source: &S, max_lookback: u32) -> Result<u32>
where
    S: InstanceSource + ?Sized,
{
    let mut streak = 0u32;
    let mut day = today;

    for offset in 0..max_lookback {
        match source.instance_on(day)? {
            Some(status) if status.completed => streak += 1,
            Some(_) => {
                tracing::debug!("Streak broken on {} after {} day(s)", day, streak);
                break;
            }
            None if offset == 0 => {}
            None => {
                tracing::debug!("No instance on {}, streak stops at {}", day, streak);
                break;
            }
        }

        day = match day.pred_opt() {
            Some(previous) => previous,
            None => break,
        };
    }

    Ok(streak)
}

/// Totals for a window of records
pub fn summarize(records: &[ActivityRecord]) -> ActivitySummary {
    let days = records.len() as u32;
    let completed_days = records.iter().filter(|r| r.completed).count() as u32;
    let total_xp = records.iter().map(|r| r.xp_earned).sum();
    let completion_rate = if days == 0 {
        0.0
    } else {
        f64::from(completed_days) / f64::from(days)
    };

    ActivitySummary {
        days,
        completed_days,
        total_xp,
        completion_rate,
    }
}

/// Longest run of consecutive completed records in a window
pub fn longest_run(records: &[ActivityRecord]) -> u32 {
    let mut best = 0u32;
    let mut current = 0u32;
    let mut previous: Option<CalendarDate> = None;

    for record in records {
        let contiguous = previous.and_then(|p| p.succ_opt()) == Some(record.date);
        if record.completed {
            current = if contiguous { current + 1 } else { 1 };
            best = best.max(current);
        } else {
            current = 0;
        }
        previous = Some(record.date);
    }

    best
}
