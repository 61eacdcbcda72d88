//! Core domain types for the Questlog system.
//!
//! This module defines:
//! - Quest templates and their kinds
//! - Materialized quest instances
//! - Priority levels and their fixed point values

use crate::recurrence::{decode, RecurrenceRule};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Priority
// ============================================================================

/// Quest priority, mapped to fixed base points at the boundary
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Optional,
    Minor,
    Standard,
    Important,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Optional,
        Priority::Minor,
        Priority::Standard,
        Priority::Important,
        Priority::Critical,
    ];

    /// Base points awarded for completing a quest of this priority
    pub fn points(self) -> u32 {
        match self {
            Priority::Optional => 5,
            Priority::Minor => 10,
            Priority::Standard => 20,
            Priority::Important => 35,
            Priority::Critical => 50,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Standard
    }
}

impl TryFrom<u32> for Priority {
    type Error = Error;

    /// Exact point values only; anything else is rejected rather than rounded
    fn try_from(points: u32) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.points() == points)
            .ok_or_else(|| Error::Other(format!("{} points is not a priority level", points)))
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "optional" => Ok(Priority::Optional),
            "minor" => Ok(Priority::Minor),
            "standard" => Ok(Priority::Standard),
            "important" => Ok(Priority::Important),
            "critical" => Ok(Priority::Critical),
            other => Err(Error::Other(format!("Unknown priority: {}", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Optional => "optional",
            Priority::Minor => "minor",
            Priority::Standard => "standard",
            Priority::Important => "important",
            Priority::Critical => "critical",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Daily quests repeat; side quests are usually one-off with a due date
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Daily,
    Side,
}

impl FromStr for QuestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(QuestKind::Daily),
            "side" => Ok(QuestKind::Side),
            other => Err(Error::Other(format!("Unknown quest kind: {}", other))),
        }
    }
}

/// A quest definition from which daily instances are materialized
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    pub id: String,
    pub title: String,
    pub kind: QuestKind,
    pub recurrence_rule: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub base_points: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl QuestTemplate {
    /// Build a template, validating its recurrence rule up front
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: QuestKind,
        recurrence_rule: Option<String>,
        due_date: Option<NaiveDate>,
        priority: Priority,
    ) -> Result<Self> {
        // Store the canonical encoding so equivalent rules compare equal
        let recurrence_rule = decode(recurrence_rule.as_deref())?.encode()?;
        Ok(Self {
            id: id.into(),
            title: title.into(),
            kind,
            recurrence_rule,
            due_date,
            base_points: priority.points(),
            is_active: true,
            created_at: Utc::now(),
        })
    }

    /// Decode the stored rule; malformed rules are surfaced as errors
    pub fn rule(&self) -> Result<RecurrenceRule> {
        decode(self.recurrence_rule.as_deref())
    }

    /// Whether an instance of this quest is scheduled on `date`
    pub fn is_scheduled_on(&self, date: NaiveDate) -> Result<bool> {
        if self.due_date.is_some_and(|due| date > due) {
            return Ok(false);
        }
        Ok(self.rule()?.occurs_on(date, self.due_date))
    }
}

// ============================================================================
// Instances
// ============================================================================

/// One materialized occurrence of a template on a calendar date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestInstance {
    pub id: Uuid,
    pub template_id: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub xp_reward: u32,
    pub base_points: u32,
    pub recorded_at: DateTime<Utc>,
}

impl QuestInstance {
    /// Record an outcome for `template` on `date`.
    ///
    /// Completed instances reward the template's base points as XP.
    pub fn record(template: &QuestTemplate, date: NaiveDate, completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id: template.id.clone(),
            date,
            completed,
            xp_reward: template.base_points,
            base_points: template.base_points,
            recorded_at: Utc::now(),
        }
    }

    pub fn status(&self) -> InstanceStatus {
        InstanceStatus {
            completed: self.completed,
            xp_reward: self.xp_reward,
        }
    }
}

/// The part of an instance the activity evaluator reads
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceStatus {
    pub completed: bool,
    pub xp_reward: u32,
}

impl InstanceStatus {
    pub fn completed(xp_reward: u32) -> Self {
        Self {
            completed: true,
            xp_reward,
        }
    }

    pub fn missed(xp_reward: u32) -> Self {
        Self {
            completed: false,
            xp_reward,
        }
    }
}

/// All stored templates keyed by id
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TemplateBook {
    pub templates: HashMap<String, QuestTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_priority_points_are_fixed() {
        let points: Vec<u32> = Priority::ALL.iter().map(|p| p.points()).collect();
        assert_eq!(points, vec![5, 10, 20, 35, 50]);
        assert_eq!(Priority::try_from(35).unwrap(), Priority::Important);
        assert!(Priority::try_from(30).is_err());
        assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!(Priority::default(), Priority::Standard);
    }

    #[test]
    fn test_template_canonicalizes_rule() {
        let template = QuestTemplate::new(
            "stretch",
            "Stretch",
            QuestKind::Daily,
            Some("freq=weekly;byday=fr,mo".into()),
            None,
            Priority::Minor,
        )
        .unwrap();
        assert_eq!(
            template.recurrence_rule.as_deref(),
            Some("FREQ=WEEKLY;BYDAY=MO,FR")
        );
        assert_eq!(template.base_points, 10);
        assert!(template.is_active);
    }

    #[test]
    fn test_template_rejects_malformed_rule() {
        let result = QuestTemplate::new(
            "bad",
            "Bad",
            QuestKind::Daily,
            Some("FREQ=HOURLY".into()),
            None,
            Priority::Standard,
        );
        assert!(matches!(result, Err(Error::MalformedRule(_))));
    }

    #[test]
    fn test_one_time_template_scheduled_on_due_date() {
        let due = date(2026, 11, 20);
        let template = QuestTemplate::new(
            "taxes",
            "File taxes",
            QuestKind::Side,
            None,
            Some(due),
            Priority::Critical,
        )
        .unwrap();
        assert_eq!(template.recurrence_rule, None);
        assert!(template.is_scheduled_on(due).unwrap());
        assert!(!template.is_scheduled_on(date(2026, 11, 19)).unwrap());
    }

    #[test]
    fn test_recurring_template_stops_after_due_date() {
        let template = QuestTemplate::new(
            "run",
            "Run",
            QuestKind::Daily,
            Some("FREQ=DAILY".into()),
            Some(date(2026, 12, 31)),
            Priority::Standard,
        )
        .unwrap();
        assert!(template.is_scheduled_on(date(2026, 12, 31)).unwrap());
        assert!(!template.is_scheduled_on(date(2027, 1, 1)).unwrap());
    }

    #[test]
    fn test_instance_record_uses_template_points() {
        let template = QuestTemplate::new(
            "read",
            "Read",
            QuestKind::Daily,
            Some("FREQ=DAILY".into()),
            None,
            Priority::Important,
        )
        .unwrap();
        let instance = QuestInstance::record(&template, date(2026, 10, 18), true);
        assert_eq!(instance.template_id, "read");
        assert_eq!(instance.status(), InstanceStatus::completed(35));
    }
}
