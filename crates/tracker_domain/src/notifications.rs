use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::roadmap::DailyTask;

/// Emitted once when a roadmap day flips from incomplete to complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub day: u32,
    pub task: String,
    pub completed_at: NaiveDateTime,
}

impl CompletionNotice {
    pub fn new(task: &DailyTask, completed_at: NaiveDateTime) -> Self {
        Self {
            day: task.day,
            task: task.task.clone(),
            completed_at,
        }
    }

    pub fn title(&self) -> String {
        format!("Day {} complete", self.day)
    }
}

/// Platform-specific celebration/notification adapters will implement this trait.
pub trait CompletionSink: Send + Sync {
    fn celebrate(&self, notice: CompletionNotice);
}
