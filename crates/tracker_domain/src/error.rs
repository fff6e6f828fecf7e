use thiserror::Error;

use crate::mission::MissionId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoadmapError {
    #[error("no roadmap task planned for day {0}")]
    DayNotFound(u32),

    #[error("day {day} has {len} sub-task(s), index {index} is out of range")]
    SubTaskOutOfRange { day: u32, index: usize, len: usize },

    #[error("study log for day {day} sub-task {index} has no duration")]
    EmptyStudyLog { day: u32, index: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MissionError {
    #[error("mission title must not be empty")]
    EmptyTitle,

    #[error("a target date is required")]
    MissingTargetDate,

    #[error("`{0}` is not a valid target date")]
    InvalidTargetDate(String),

    #[error("`{0}` is not a positive number of days")]
    InvalidDayCount(String),

    #[error("unknown mission `{0}`")]
    NotFound(MissionId),

    #[error("mission id `{0}` is already in use")]
    DuplicateId(MissionId),
}

/// Structural problems in a tracker state handed over by the owner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("roadmap days are 1-based, found day 0")]
    ZeroDay,

    #[error("roadmap day {0} appears more than once")]
    DuplicateDay(u32),

    #[error("mission id `{0}` appears more than once")]
    DuplicateMissionId(MissionId),

    #[error("selected mission `{0}` is not in the mission list")]
    UnknownSelection(MissionId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority `{0}`, expected one of low, medium, high, extreme")]
pub struct PriorityParseError(pub String);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Roadmap(#[from] RoadmapError),

    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error("malformed tracker snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("invalid tracker state: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    #[error("action `{0}` did not report its outcome")]
    MissingOutcome(&'static str),
}
