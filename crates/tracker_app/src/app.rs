use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracker_domain::{
    mission::missions_by_deadline,
    roadmap::DailyTask,
    study::format_seconds,
    TrackerService, TrackerState,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) state_path: Option<PathBuf>,
    pub(crate) current_day: u32,
    pub(crate) selected_day: Option<u32>,
    pub(crate) deadline_warning_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("TRACKER_STATE") {
            if !path.trim().is_empty() {
                config.state_path = Some(PathBuf::from(path.trim()));
            }
        }
        if let Some(day) = lookup("TRACKER_CURRENT_DAY") {
            match day.trim().parse::<u32>() {
                Ok(value) if value > 0 => config.current_day = value,
                _ => warn!(value = %day, "ignoring invalid TRACKER_CURRENT_DAY"),
            }
        }
        if let Some(day) = lookup("TRACKER_SELECTED_DAY") {
            match day.trim().parse::<u32>() {
                Ok(value) if value > 0 => config.selected_day = Some(value),
                _ => warn!(value = %day, "ignoring invalid TRACKER_SELECTED_DAY"),
            }
        }
        if let Some(warning) = lookup("TRACKER_DEADLINE_WARNING_DAYS") {
            match warning.trim().parse::<i64>() {
                Ok(value) => config.deadline_warning_days = value.max(0),
                Err(_) => warn!(value = %warning, "ignoring invalid TRACKER_DEADLINE_WARNING_DAYS"),
            }
        }
        config
    }

    pub fn selected_day(&self) -> u32 {
        self.selected_day.unwrap_or(self.current_day)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            current_day: 1,
            selected_day: None,
            deadline_warning_days: 3,
        }
    }
}

pub fn load_snapshot(path: &Path) -> Result<TrackerState> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let state = TrackerState::from_json(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    info!(
        path = %path.display(),
        days = state.roadmap.len(),
        missions = state.missions.len(),
        "snapshot loaded"
    );
    Ok(state)
}

/// Text overview of the selected roadmap day and every mission, as of the service clock.
pub fn render_overview(service: &TrackerService, config: &AppConfig) -> Vec<String> {
    let now = service.now();
    let state = service.snapshot();
    let selected_day = config.selected_day();
    let mut lines = Vec::new();

    let progress = service.progress();
    lines.push(format!(
        "Day {} of {} ({}/{} days complete, {}%)",
        selected_day,
        progress.total_days,
        progress.completed_days,
        progress.total_days,
        progress.percent()
    ));
    if let Some(total) = format_seconds(progress.study_seconds) {
        lines.push(format!("Total study time: {}", total));
    }

    let outstanding = service.carry_forward_warning(config.current_day, selected_day);
    if !outstanding.is_empty() {
        lines.push(format!(
            "Warning: {} earlier day(s) still incomplete: {}",
            outstanding.len(),
            describe_days(&outstanding)
        ));
    }

    match state.day(selected_day) {
        Some(task) => lines.extend(render_day(task)),
        None => lines.push(format!("No tasks planned for day {}", selected_day)),
    }

    lines.push(String::new());
    if state.missions.is_empty() {
        lines.push("No missions".to_string());
        return lines;
    }
    lines.push("Missions:".to_string());
    for mission in missions_by_deadline(&state.missions) {
        let marker = if state.selected_mission.as_ref() == Some(&mission.id) {
            ">"
        } else {
            "*"
        };
        let mut line = format!(
            "{} {} [{} · {}] {}",
            marker,
            mission.title,
            mission.priority,
            mission.category,
            mission.time_left(now)
        );
        if mission.is_due_within(now, config.deadline_warning_days) {
            line.push_str(" (due soon)");
        }
        lines.push(line);
    }
    debug!(line_count = lines.len(), "overview rendered");
    lines
}

fn render_day(task: &DailyTask) -> Vec<String> {
    task.sub_tasks
        .iter()
        .map(|sub_task| {
            let check = if sub_task.completed { "x" } else { " " };
            match sub_task.study_label() {
                Some(label) => format!("[{}] {} ({})", check, sub_task.text, label),
                None => format!("[{}] {}", check, sub_task.text),
            }
        })
        .collect()
}

fn describe_days(tasks: &[DailyTask]) -> String {
    tasks
        .iter()
        .map(|task| format!("day {}", task.day))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run(config: AppConfig) -> Result<()> {
    let state = match &config.state_path {
        Some(path) => load_snapshot(path)?,
        None => {
            warn!("TRACKER_STATE is not set, showing an empty tracker");
            TrackerState::default()
        }
    };
    let service = TrackerService::builder()
        .with_state(state)
        .build()
        .context("snapshot is not a consistent tracker")?;
    for line in render_overview(&service, &config) {
        println!("{}", line);
    }
    Ok(())
}
