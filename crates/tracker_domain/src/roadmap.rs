use serde::{Deserialize, Serialize};

use crate::{
    error::RoadmapError,
    study::{self, StudyLog},
};

pub const SUB_TASK_SEPARATOR: char = ';';

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub study_logs: Vec<StudyLog>,
}

impl SubTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            study_logs: Vec::new(),
        }
    }

    pub fn study_seconds(&self) -> u64 {
        study::total_seconds(&self.study_logs)
    }

    pub fn study_label(&self) -> Option<String> {
        study::format_study_time(&self.study_logs)
    }
}

/// One day of a study roadmap. `task` is the source of truth; `sub_tasks` and
/// `completed` are derived from it by [`DailyTask::reconcile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub day: u32,
    pub task: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

impl DailyTask {
    pub fn new(day: u32, task: impl Into<String>) -> Self {
        let mut daily = Self {
            day,
            task: task.into(),
            completed: false,
            sub_tasks: Vec::new(),
        };
        daily.reconcile();
        daily
    }

    /// Rebuilds `sub_tasks` from `task` and recomputes `completed`.
    ///
    /// Recorded state follows the sub-task text: a segment keeps the state of
    /// the previous sub-task at the same position when its text is unchanged,
    /// otherwise of the first unclaimed previous sub-task with the same text.
    /// New segments start incomplete. A day that was marked complete without
    /// any sub-task detail seeds every segment as complete.
    pub fn reconcile(&mut self) {
        let segments = split_sub_tasks(&self.task);
        let seed_completed = self.sub_tasks.is_empty() && self.completed;
        let mut previous: Vec<Option<SubTask>> = std::mem::take(&mut self.sub_tasks)
            .into_iter()
            .map(Some)
            .collect();

        self.sub_tasks = segments
            .into_iter()
            .enumerate()
            .map(|(idx, text)| match claim_previous(&mut previous, idx, &text) {
                Some(mut carried) => {
                    carried.text = text;
                    carried
                }
                None => SubTask {
                    completed: seed_completed,
                    ..SubTask::new(text)
                },
            })
            .collect();
        self.completed = all_completed(&self.sub_tasks);
    }

    pub fn is_consistent(&self) -> bool {
        let segments = split_sub_tasks(&self.task);
        segments.len() == self.sub_tasks.len()
            && segments
                .iter()
                .zip(&self.sub_tasks)
                .all(|(segment, sub_task)| *segment == sub_task.text)
            && self.completed == all_completed(&self.sub_tasks)
    }

    pub fn study_seconds(&self) -> u64 {
        self.sub_tasks
            .iter()
            .fold(0u64, |acc, sub_task| acc.saturating_add(sub_task.study_seconds()))
    }

    pub fn completed_sub_tasks(&self) -> usize {
        self.sub_tasks.iter().filter(|sub| sub.completed).count()
    }
}

fn claim_previous(previous: &mut [Option<SubTask>], idx: usize, text: &str) -> Option<SubTask> {
    let same_position =
        matches!(previous.get(idx), Some(Some(sub_task)) if sub_task.text.trim() == text);
    if same_position {
        return previous[idx].take();
    }
    previous
        .iter_mut()
        .find(|slot| matches!(slot, Some(sub_task) if sub_task.text.trim() == text))
        .and_then(Option::take)
}

fn all_completed(sub_tasks: &[SubTask]) -> bool {
    sub_tasks.iter().all(|sub_task| sub_task.completed)
}

/// Splits a roadmap entry into trimmed sub-task texts, preserving order.
pub fn split_sub_tasks(task: &str) -> Vec<String> {
    task.split(SUB_TASK_SEPARATOR)
        .map(|segment| segment.trim().to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub tasks: Vec<DailyTask>,
    /// Set only when this call moved the day from incomplete to complete.
    pub just_completed: Option<DailyTask>,
}

/// Marks one sub-task of `day` as completed or not and recomputes the day.
///
/// The input list is left untouched; every other day is copied through as is.
pub fn apply_completion(
    tasks: &[DailyTask],
    day: u32,
    index: usize,
    completed: bool,
) -> Result<CompletionOutcome, RoadmapError> {
    let position = position_of_day(tasks, day)?;
    let previous = &tasks[position];

    let mut updated = previous.clone();
    updated.reconcile();
    let len = updated.sub_tasks.len();
    let sub_task = updated
        .sub_tasks
        .get_mut(index)
        .ok_or(RoadmapError::SubTaskOutOfRange { day, index, len })?;
    sub_task.completed = completed;
    updated.completed = all_completed(&updated.sub_tasks);

    let just_completed = (updated.completed && !previous.completed).then(|| updated.clone());
    let mut next = tasks.to_vec();
    next[position] = updated;
    Ok(CompletionOutcome {
        tasks: next,
        just_completed,
    })
}

/// Appends a study log to one sub-task of `day`.
pub fn log_study(
    tasks: &[DailyTask],
    day: u32,
    index: usize,
    duration: u64,
) -> Result<Vec<DailyTask>, RoadmapError> {
    if duration == 0 {
        return Err(RoadmapError::EmptyStudyLog { day, index });
    }
    let position = position_of_day(tasks, day)?;

    let mut updated = tasks[position].clone();
    updated.reconcile();
    let len = updated.sub_tasks.len();
    updated
        .sub_tasks
        .get_mut(index)
        .ok_or(RoadmapError::SubTaskOutOfRange { day, index, len })?
        .study_logs
        .push(StudyLog::new(duration));

    let mut next = tasks.to_vec();
    next[position] = updated;
    Ok(next)
}

fn position_of_day(tasks: &[DailyTask], day: u32) -> Result<usize, RoadmapError> {
    tasks
        .iter()
        .position(|task| task.day == day)
        .ok_or(RoadmapError::DayNotFound(day))
}

/// Days before `current_day` that are still incomplete.
pub fn outstanding_before(tasks: &[DailyTask], current_day: u32) -> Vec<&DailyTask> {
    tasks
        .iter()
        .filter(|task| task.day < current_day && !task.completed)
        .collect()
}

/// Incomplete earlier days to warn about while viewing `selected_day`.
///
/// Returns nothing while a past day is being reviewed.
pub fn carry_forward_warning(
    tasks: &[DailyTask],
    current_day: u32,
    selected_day: u32,
) -> Option<Vec<&DailyTask>> {
    if selected_day < current_day {
        return None;
    }
    let outstanding = outstanding_before(tasks, current_day);
    (!outstanding.is_empty()).then_some(outstanding)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapProgress {
    pub completed_days: usize,
    pub total_days: usize,
    pub completed_sub_tasks: usize,
    pub total_sub_tasks: usize,
    pub study_seconds: u64,
}

impl RoadmapProgress {
    pub fn of(tasks: &[DailyTask]) -> Self {
        tasks.iter().fold(Self::default(), |mut progress, task| {
            progress.total_days += 1;
            if task.completed {
                progress.completed_days += 1;
            }
            progress.total_sub_tasks += task.sub_tasks.len();
            progress.completed_sub_tasks += task.completed_sub_tasks();
            progress.study_seconds = progress.study_seconds.saturating_add(task.study_seconds());
            progress
        })
    }

    /// Completed days as a whole percentage, rounded down.
    pub fn percent(&self) -> u8 {
        if self.total_days == 0 {
            return 0;
        }
        ((self.completed_days * 100) / self.total_days) as u8
    }
}
