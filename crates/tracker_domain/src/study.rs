use serde::{Deserialize, Serialize};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;

/// A single block of study time recorded against a sub-task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyLog {
    /// Seconds spent.
    pub duration: u64,
}

impl StudyLog {
    pub fn new(duration: u64) -> Self {
        Self { duration }
    }
}

pub fn total_seconds<'a>(logs: impl IntoIterator<Item = &'a StudyLog>) -> u64 {
    logs.into_iter()
        .fold(0u64, |acc, log| acc.saturating_add(log.duration))
}

/// Human readable summary of the time logged, or `None` when nothing was logged.
///
/// Only the two most significant units are shown: hours hide seconds, and
/// seconds are shown alone below one minute.
pub fn format_study_time(logs: &[StudyLog]) -> Option<String> {
    format_seconds(total_seconds(logs))
}

pub fn format_seconds(total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    let hours = total / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    let label = if hours > 0 {
        format!("{}h {}m logged", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s logged", minutes, seconds)
    } else {
        format!("{}s logged", seconds)
    };
    Some(label)
}
