//! Recurrence rules for quest templates.
//!
//! Rules are stored as a restricted RRULE string:
//!
//! ```text
//! FREQ=<DAILY|WEEKLY|MONTHLY>[;BYDAY=<SU,MO,..>][;BYMONTHDAY=<1..31,..>]
//! ```
//!
//! A missing or empty rule means a one-time quest. Encoders canonicalize their
//! input (sorted, deduplicated) so equal selections always produce the same
//! string, and the decoder refuses anything it cannot represent exactly.

use crate::dates::{days_inclusive, CalendarDate};
use crate::{Error, Result};
use chrono::{Datelike, Weekday};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Two-letter BYDAY codes indexed by Sunday-based ordinal
const WEEKDAY_CODES: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// Compact initials, indexed like `WEEKDAY_CODES`
const WEEKDAY_INITIALS: [&str; 7] = ["Su", "M", "Tu", "W", "Th", "F", "Sa"];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const WORKWEEK: [u32; 5] = [1, 2, 3, 4, 5];
const WEEKEND: [u32; 2] = [0, 6];

/// How often a rule repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
    Monthly,
}

/// A decoded recurrence rule.
///
/// Weekly days and monthly dates are kept sorted and deduplicated; use
/// [`RecurrenceRule::weekly`] and [`RecurrenceRule::monthly`] to build them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecurrenceRule {
    /// No repetition
    Once,
    /// Every day
    Daily,
    /// On the listed weekdays
    Weekly(Vec<Weekday>),
    /// On the listed days of the month (1..=31)
    Monthly(Vec<u32>),
}

/// Sunday-based ordinal of a weekday (Sunday = 0 .. Saturday = 6)
pub fn weekday_ordinal(day: Weekday) -> u32 {
    day.num_days_from_sunday()
}

/// Weekday for a Sunday-based ordinal
pub fn weekday_from_ordinal(ordinal: u32) -> Option<Weekday> {
    match ordinal {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Weekday for a two-letter code (`MO`, `tu`, ...)
pub fn parse_weekday_code(code: &str) -> Option<Weekday> {
    let upper = code.trim().to_ascii_uppercase();
    WEEKDAY_CODES
        .iter()
        .position(|c| *c == upper)
        .and_then(|idx| weekday_from_ordinal(idx as u32))
}

fn weekday_code(day: Weekday) -> &'static str {
    WEEKDAY_CODES[weekday_ordinal(day) as usize]
}

fn canonical_weekdays(days: &[Weekday]) -> Result<Vec<Weekday>> {
    let ordinals: BTreeSet<u32> = days.iter().copied().map(weekday_ordinal).collect();
    if ordinals.is_empty() {
        return Err(Error::InvalidRule(
            "weekly rule needs at least one weekday".into(),
        ));
    }
    Ok(ordinals
        .into_iter()
        .filter_map(weekday_from_ordinal)
        .collect())
}

fn canonical_month_days(dates: &[u32]) -> Result<Vec<u32>> {
    if dates.is_empty() {
        return Err(Error::InvalidRule(
            "monthly rule needs at least one date".into(),
        ));
    }
    if let Some(bad) = dates.iter().find(|d| !(1..=31).contains(*d)) {
        return Err(Error::InvalidRule(format!(
            "day of month {} is outside 1..=31",
            bad
        )));
    }
    let sorted: BTreeSet<u32> = dates.iter().copied().collect();
    Ok(sorted.into_iter().collect())
}

/// Canonical token for "every day"
pub fn encode_daily() -> String {
    "FREQ=DAILY".to_string()
}

/// Encode a weekly rule. Day order and duplicates in `days` do not matter.
pub fn encode_weekly(days: &[Weekday]) -> Result<String> {
    let days = canonical_weekdays(days)?;
    let codes: Vec<&str> = days.iter().copied().map(weekday_code).collect();
    Ok(format!("FREQ=WEEKLY;BYDAY={}", codes.join(",")))
}

/// Encode a monthly rule over days of the month in 1..=31
pub fn encode_monthly(dates: &[u32]) -> Result<String> {
    let dates = canonical_month_days(dates)?;
    let list: Vec<String> = dates.iter().map(u32::to_string).collect();
    Ok(format!("FREQ=MONTHLY;BYMONTHDAY={}", list.join(",")))
}

/// Decode a stored rule string.
///
/// `None`, empty and whitespace-only input decode to [`RecurrenceRule::Once`].
/// Anything else must match the grammar exactly; a malformed rule is an
/// error, never a one-time quest.
pub fn decode(rule: Option<&str>) -> Result<RecurrenceRule> {
    let raw = match rule.map(str::trim) {
        None | Some("") => return Ok(RecurrenceRule::Once),
        Some(raw) => raw,
    };
    let body = strip_rrule_prefix(raw);

    let mut frequency: Option<Frequency> = None;
    let mut by_day: Option<Vec<Weekday>> = None;
    let mut by_month_day: Option<Vec<u32>> = None;

    for segment in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| Error::MalformedRule(format!("`{}` has no value in `{}`", segment, raw)))?;
        let key = key.trim().to_ascii_uppercase();
        match key.as_str() {
            "FREQ" => {
                reject_duplicate(frequency.is_some(), &key, raw)?;
                frequency = Some(parse_frequency(value, raw)?);
            }
            "BYDAY" => {
                reject_duplicate(by_day.is_some(), &key, raw)?;
                by_day = Some(parse_by_day(value, raw)?);
            }
            "BYMONTHDAY" => {
                reject_duplicate(by_month_day.is_some(), &key, raw)?;
                by_month_day = Some(parse_by_month_day(value, raw)?);
            }
            _ => {
                return Err(Error::MalformedRule(format!(
                    "unsupported part `{}` in `{}`",
                    key, raw
                )))
            }
        }
    }

    let frequency =
        frequency.ok_or_else(|| Error::MalformedRule(format!("missing FREQ in `{}`", raw)))?;

    let rule = match frequency {
        Frequency::Daily => {
            if by_day.is_some() || by_month_day.is_some() {
                return Err(Error::MalformedRule(format!(
                    "daily rule takes no BYDAY/BYMONTHDAY: `{}`",
                    raw
                )));
            }
            RecurrenceRule::Daily
        }
        Frequency::Weekly => {
            if by_month_day.is_some() {
                return Err(Error::MalformedRule(format!(
                    "BYMONTHDAY is not valid on a weekly rule: `{}`",
                    raw
                )));
            }
            let days = by_day.ok_or_else(|| {
                Error::MalformedRule(format!("weekly rule without BYDAY: `{}`", raw))
            })?;
            RecurrenceRule::Weekly(days)
        }
        Frequency::Monthly => {
            if by_day.is_some() {
                return Err(Error::MalformedRule(format!(
                    "BYDAY is not valid on a monthly rule: `{}`",
                    raw
                )));
            }
            let dates = by_month_day.ok_or_else(|| {
                Error::MalformedRule(format!("monthly rule without BYMONTHDAY: `{}`", raw))
            })?;
            RecurrenceRule::Monthly(dates)
        }
        Frequency::Once => {
            return Err(Error::MalformedRule(format!(
                "one-time rules are stored empty, not as `{}`",
                raw
            )))
        }
    };

    tracing::debug!("Decoded recurrence rule `{}` as {:?}", raw, rule);
    Ok(rule)
}

/// Render a stored rule as display text.
///
/// `compact` selects the short label used in lists and badges.
pub fn to_human_readable(rule: Option<&str>, compact: bool) -> Result<String> {
    Ok(decode(rule)?.describe(compact))
}

/// `1` -> `1st`, `12` -> `12th`, `23` -> `23rd`
pub fn ordinal_suffix(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn strip_rrule_prefix(raw: &str) -> &str {
    match raw.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => raw[6..].trim_start(),
        _ => raw,
    }
}

fn reject_duplicate(seen: bool, key: &str, raw: &str) -> Result<()> {
    if seen {
        return Err(Error::MalformedRule(format!(
            "{} appears more than once in `{}`",
            key, raw
        )));
    }
    Ok(())
}

fn parse_frequency(value: &str, raw: &str) -> Result<Frequency> {
    match value.trim().to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        other => Err(Error::MalformedRule(format!(
            "unsupported FREQ `{}` in `{}`",
            other, raw
        ))),
    }
}

fn parse_by_day(value: &str, raw: &str) -> Result<Vec<Weekday>> {
    let codes: Vec<&str> = value.split(',').map(str::trim).collect();
    if codes.iter().any(|c| c.is_empty()) {
        return Err(Error::MalformedRule(format!("empty BYDAY entry in `{}`", raw)));
    }

    let mut days = Vec::with_capacity(codes.len());
    let mut unmapped = 0usize;
    for code in &codes {
        match parse_weekday_code(code) {
            Some(day) => days.push(day),
            None => unmapped += 1,
        }
    }

    if days.is_empty() {
        return Err(Error::InvalidRule(format!(
            "no recognizable weekday in BYDAY of `{}`",
            raw
        )));
    }
    if unmapped > 0 {
        tracing::warn!(
            "Dropped {} unrecognized BYDAY code(s) from `{}`",
            unmapped,
            raw
        );
    }
    canonical_weekdays(&days)
}

fn parse_by_month_day(value: &str, raw: &str) -> Result<Vec<u32>> {
    let dates = value
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<u32>()
                .ok()
                .filter(|d| (1..=31).contains(d))
                .ok_or_else(|| {
                    Error::MalformedRule(format!(
                        "BYMONTHDAY entry `{}` is not a day 1..=31 in `{}`",
                        item.trim(),
                        raw
                    ))
                })
        })
        .collect::<Result<Vec<u32>>>()?;
    canonical_month_days(&dates)
}

/// Join display items: `a`, `a and b`, `a, b and c` (`a, b, and c` with `oxford`)
fn join_list(items: &[String], oxford: bool) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => {
            let separator = if oxford { ", and " } else { " and " };
            format!("{}{}{}", init.join(", "), separator, last)
        }
    }
}

impl RecurrenceRule {
    /// Weekly rule over `days`, canonicalized
    pub fn weekly(days: &[Weekday]) -> Result<Self> {
        Ok(RecurrenceRule::Weekly(canonical_weekdays(days)?))
    }

    /// Monthly rule over `dates`, canonicalized
    pub fn monthly(dates: &[u32]) -> Result<Self> {
        Ok(RecurrenceRule::Monthly(canonical_month_days(dates)?))
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            RecurrenceRule::Once => Frequency::Once,
            RecurrenceRule::Daily => Frequency::Daily,
            RecurrenceRule::Weekly(_) => Frequency::Weekly,
            RecurrenceRule::Monthly(_) => Frequency::Monthly,
        }
    }

    /// Storable form; `None` for a one-time rule
    pub fn encode(&self) -> Result<Option<String>> {
        match self {
            RecurrenceRule::Once => Ok(None),
            RecurrenceRule::Daily => Ok(Some(encode_daily())),
            RecurrenceRule::Weekly(days) => encode_weekly(days).map(Some),
            RecurrenceRule::Monthly(dates) => encode_monthly(dates).map(Some),
        }
    }

    /// Exactly Monday through Friday
    pub fn is_weekdays(&self) -> bool {
        self.weekday_ordinals().as_deref() == Some(&WORKWEEK[..])
    }

    /// Exactly Saturday and Sunday
    pub fn is_weekends(&self) -> bool {
        self.weekday_ordinals().as_deref() == Some(&WEEKEND[..])
    }

    fn weekday_ordinals(&self) -> Option<Vec<u32>> {
        match self {
            RecurrenceRule::Weekly(days) => {
                let set: BTreeSet<u32> = days.iter().copied().map(weekday_ordinal).collect();
                Some(set.into_iter().collect())
            }
            _ => None,
        }
    }

    /// Display text for this rule
    pub fn describe(&self, compact: bool) -> String {
        match self {
            RecurrenceRule::Once => "One-time task".to_string(),
            RecurrenceRule::Daily => "Every day".to_string(),
            RecurrenceRule::Weekly(_) if self.is_weekdays() => {
                let label = if compact {
                    "Weekdays"
                } else {
                    "Every weekday (Mon-Fri)"
                };
                label.to_string()
            }
            RecurrenceRule::Weekly(_) if self.is_weekends() => {
                let label = if compact {
                    "Weekends"
                } else {
                    "Every weekend (Sat-Sun)"
                };
                label.to_string()
            }
            RecurrenceRule::Weekly(days) => {
                let ordinals: Vec<usize> = days
                    .iter()
                    .map(|d| weekday_ordinal(*d) as usize)
                    .collect();
                if compact {
                    let initials: Vec<&str> =
                        ordinals.iter().map(|i| WEEKDAY_INITIALS[*i]).collect();
                    initials.join(", ")
                } else {
                    let names: Vec<String> = ordinals
                        .iter()
                        .map(|i| WEEKDAY_NAMES[*i].to_string())
                        .collect();
                    format!("Every {}", join_list(&names, false))
                }
            }
            RecurrenceRule::Monthly(dates) => {
                if compact {
                    "Monthly".to_string()
                } else {
                    let ordinals: Vec<String> = dates.iter().map(|d| ordinal_suffix(*d)).collect();
                    format!("{} of each month", join_list(&ordinals, true))
                }
            }
        }
    }

    /// Whether the rule schedules a quest on `date`.
    ///
    /// `anchor` is the date a one-time quest is due; one-time rules without
    /// an anchor never occur. Monthly dates past the end of a month are skipped.
    pub fn occurs_on(&self, date: CalendarDate, anchor: Option<CalendarDate>) -> bool {
        match self {
            RecurrenceRule::Once => anchor == Some(date),
            RecurrenceRule::Daily => true,
            RecurrenceRule::Weekly(days) => days.contains(&date.weekday()),
            RecurrenceRule::Monthly(dates) => dates.contains(&date.day()),
        }
    }

    /// All scheduled dates in `[start, end]`, ascending
    pub fn occurrences(
        &self,
        start: CalendarDate,
        end: CalendarDate,
        anchor: Option<CalendarDate>,
    ) -> Result<Vec<CalendarDate>> {
        Ok(days_inclusive(start, end)?
            .filter(|day| self.occurs_on(*day, anchor))
            .collect())
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(false))
    }
}

impl FromStr for RecurrenceRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode(Some(s))
    }
}
