use std::{fmt, str::FromStr};

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
    countdown::{self, TimeLeft},
    error::{MissionError, PriorityParseError},
    ports::IdGenerator,
};

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(String);

impl MissionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed case-insensitively by both `FromStr` and serde; always written lowercase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Extreme => "extreme",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| PriorityParseError(s.to_string()))
    }
}

impl TryFrom<String> for Priority {
    type Error = PriorityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MissionTask {
    pub id: MissionId,
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub start_date: NaiveDateTime,
    pub target_date: NaiveDateTime,
}

impl MissionTask {
    pub fn time_left(&self, now: NaiveDateTime) -> TimeLeft {
        countdown::time_left(self.target_date, now)
    }

    /// True when the target day is today or within the next `days` days.
    pub fn is_due_within(&self, now: NaiveDateTime, days: i64) -> bool {
        let remaining = countdown::days_until(self.target_date, now);
        (0..=days).contains(&remaining)
    }

    /// Share of the start→target span already used, clamped to `0.0..=1.0`.
    pub fn elapsed_fraction(&self, now: NaiveDateTime) -> f64 {
        let total = self
            .target_date
            .signed_duration_since(self.start_date)
            .num_milliseconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = now
            .signed_duration_since(self.start_date)
            .num_milliseconds()
            .clamp(0, total);
        elapsed as f64 / total as f64
    }
}

/// How the deadline of a mission was entered. Values are kept raw so that
/// validation happens in one place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Deadline {
    OnDate(String),
    InDays(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MissionRequest {
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub deadline: Deadline,
    #[serde(default)]
    pub editing_id: Option<MissionId>,
}

impl MissionRequest {
    pub fn new(title: impl Into<String>, deadline: Deadline) -> Self {
        Self {
            title: title.into(),
            category: None,
            priority: Priority::default(),
            deadline,
            editing_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn editing(mut self, id: MissionId) -> Self {
        self.editing_id = Some(id);
        self
    }
}

/// Resolves the deadline to 23:59:59.999 local time of its calendar day.
pub fn resolve_target_date(
    deadline: &Deadline,
    now: NaiveDateTime,
) -> Result<NaiveDateTime, MissionError> {
    let date = match deadline {
        Deadline::OnDate(raw) => parse_target_date(raw)?,
        Deadline::InDays(raw) => {
            let days = parse_day_count(raw)?;
            now.date()
                .checked_add_days(Days::new(days))
                .ok_or_else(|| MissionError::InvalidDayCount(raw.trim().to_string()))?
        }
    };
    Ok(countdown::end_of_day(date))
}

fn parse_target_date(raw: &str) -> Result<NaiveDate, MissionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MissionError::MissingTargetDate);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|datetime| datetime.naive_local().date())
        .map_err(|_| MissionError::InvalidTargetDate(trimmed.to_string()))
}

fn parse_day_count(raw: &str) -> Result<u64, MissionError> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(days) if days > 0 => Ok(days.unsigned_abs()),
        _ => Err(MissionError::InvalidDayCount(trimmed.to_string())),
    }
}

fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(category) if !category.is_empty() => category.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub tasks: Vec<MissionTask>,
    /// The created or edited mission.
    pub mission_id: MissionId,
}

/// Creates a mission, or replaces the one named by `editing_id`.
///
/// Edits keep the mission's `id` and `start_date`; everything else comes from
/// the request. The input list is never modified.
pub fn submit_mission(
    tasks: &[MissionTask],
    request: &MissionRequest,
    now: NaiveDateTime,
    ids: &dyn IdGenerator,
) -> Result<SubmitOutcome, MissionError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(MissionError::EmptyTitle);
    }
    let target_date = resolve_target_date(&request.deadline, now)?;
    let category = normalize_category(request.category.as_deref());

    match &request.editing_id {
        Some(editing_id) => {
            let position = tasks
                .iter()
                .position(|task| &task.id == editing_id)
                .ok_or_else(|| MissionError::NotFound(editing_id.clone()))?;
            let mut next = tasks.to_vec();
            let existing = &tasks[position];
            next[position] = MissionTask {
                id: existing.id.clone(),
                title: title.to_string(),
                category,
                priority: request.priority,
                start_date: existing.start_date,
                target_date,
            };
            Ok(SubmitOutcome {
                tasks: next,
                mission_id: existing.id.clone(),
            })
        }
        None => {
            let mission_id = ids.generate_mission_id();
            if tasks.iter().any(|task| task.id == mission_id) {
                return Err(MissionError::DuplicateId(mission_id));
            }
            let mut next = tasks.to_vec();
            next.push(MissionTask {
                id: mission_id.clone(),
                title: title.to_string(),
                category,
                priority: request.priority,
                start_date: now,
                target_date,
            });
            Ok(SubmitOutcome {
                tasks: next,
                mission_id,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub tasks: Vec<MissionTask>,
    pub selected: Option<MissionId>,
}

/// Removes a mission. When it was the selected one, selection falls to the
/// first remaining mission (or none); otherwise it is left alone.
pub fn delete_mission(
    tasks: &[MissionTask],
    id: &MissionId,
    selected: Option<&MissionId>,
) -> Result<DeleteOutcome, MissionError> {
    if !tasks.iter().any(|task| &task.id == id) {
        return Err(MissionError::NotFound(id.clone()));
    }
    let remaining: Vec<MissionTask> = tasks.iter().filter(|task| &task.id != id).cloned().collect();
    let selected = if selected == Some(id) {
        remaining.first().map(|task| task.id.clone())
    } else {
        selected.cloned()
    };
    Ok(DeleteOutcome {
        tasks: remaining,
        selected,
    })
}

/// Missions ordered by nearest target date; ties keep their list order.
pub fn missions_by_deadline(tasks: &[MissionTask]) -> Vec<&MissionTask> {
    let mut ordered: Vec<&MissionTask> = tasks.iter().collect();
    ordered.sort_by_key(|task| task.target_date);
    ordered
}
