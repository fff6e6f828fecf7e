use std::collections::HashSet;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    countdown::TimeLeft,
    error::{MissionError, SnapshotError, TrackerError},
    mission::{self, MissionId, MissionRequest, MissionTask},
    notifications::{CompletionNotice, CompletionSink},
    ports::{Clock, IdGenerator, SystemClock, UlidGenerator},
    roadmap::{self, DailyTask, RoadmapProgress},
};

/// Everything the owner keeps for one learner. Replaced wholesale on each action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    #[serde(default)]
    pub roadmap: Vec<DailyTask>,
    #[serde(default)]
    pub missions: Vec<MissionTask>,
    #[serde(default)]
    pub selected_mission: Option<MissionId>,
}

impl TrackerState {
    /// Parses a snapshot, checks it, and re-derives every day's sub-tasks from its text.
    pub fn from_json(raw: &str) -> Result<Self, TrackerError> {
        let mut state: TrackerState = serde_json::from_str(raw)?;
        state.validate()?;
        state.reconcile();
        Ok(state)
    }

    /// Days must be positive and unique, mission ids unique, and the
    /// selection must name a listed mission.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut days = HashSet::new();
        for task in &self.roadmap {
            if task.day == 0 {
                return Err(SnapshotError::ZeroDay);
            }
            if !days.insert(task.day) {
                return Err(SnapshotError::DuplicateDay(task.day));
            }
        }
        let mut ids = HashSet::new();
        for mission in &self.missions {
            if !ids.insert(&mission.id) {
                return Err(SnapshotError::DuplicateMissionId(mission.id.clone()));
            }
        }
        match &self.selected_mission {
            Some(selected) if !ids.contains(selected) => {
                Err(SnapshotError::UnknownSelection(selected.clone()))
            }
            _ => Ok(()),
        }
    }

    fn reconcile(&mut self) {
        for task in &mut self.roadmap {
            task.reconcile();
        }
    }

    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn mission(&self, id: &MissionId) -> Option<&MissionTask> {
        self.missions.iter().find(|mission| &mission.id == id)
    }

    pub fn day(&self, day: u32) -> Option<&DailyTask> {
        self.roadmap.iter().find(|task| task.day == day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CompleteSubTask {
        day: u32,
        index: usize,
        completed: bool,
    },
    LogStudy {
        day: u32,
        index: usize,
        seconds: u64,
    },
    SubmitMission(MissionRequest),
    DeleteMission(MissionId),
    SelectMission(Option<MissionId>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CompleteSubTask { .. } => "complete_sub_task",
            Action::LogStudy { .. } => "log_study",
            Action::SubmitMission(_) => "submit_mission",
            Action::DeleteMission(_) => "delete_mission",
            Action::SelectMission(_) => "select_mission",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: TrackerState,
    pub just_completed: Option<DailyTask>,
    /// Mission created or edited by this action.
    pub mission: Option<MissionId>,
}

impl Transition {
    fn quiet(state: TrackerState) -> Self {
        Self {
            state,
            just_completed: None,
            mission: None,
        }
    }
}

/// Pure reducer: computes the next state without touching `state`.
pub fn reduce(
    state: &TrackerState,
    action: &Action,
    now: NaiveDateTime,
    ids: &dyn IdGenerator,
) -> Result<Transition, TrackerError> {
    match action {
        Action::CompleteSubTask {
            day,
            index,
            completed,
        } => {
            let outcome = roadmap::apply_completion(&state.roadmap, *day, *index, *completed)?;
            Ok(Transition {
                state: TrackerState {
                    roadmap: outcome.tasks,
                    ..state.clone()
                },
                just_completed: outcome.just_completed,
                mission: None,
            })
        }
        Action::LogStudy {
            day,
            index,
            seconds,
        } => {
            let roadmap = roadmap::log_study(&state.roadmap, *day, *index, *seconds)?;
            Ok(Transition::quiet(TrackerState {
                roadmap,
                ..state.clone()
            }))
        }
        Action::SubmitMission(request) => {
            let outcome = mission::submit_mission(&state.missions, request, now, ids)?;
            Ok(Transition {
                state: TrackerState {
                    missions: outcome.tasks,
                    ..state.clone()
                },
                just_completed: None,
                mission: Some(outcome.mission_id),
            })
        }
        Action::DeleteMission(id) => {
            let outcome =
                mission::delete_mission(&state.missions, id, state.selected_mission.as_ref())?;
            Ok(Transition::quiet(TrackerState {
                roadmap: state.roadmap.clone(),
                missions: outcome.tasks,
                selected_mission: outcome.selected,
            }))
        }
        Action::SelectMission(selection) => {
            if let Some(id) = selection {
                if state.mission(id).is_none() {
                    return Err(MissionError::NotFound(id.clone()).into());
                }
            }
            Ok(Transition::quiet(TrackerState {
                selected_mission: selection.clone(),
                ..state.clone()
            }))
        }
    }
}

/// What a successfully applied action produced, for the owner's side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    pub just_completed: Option<DailyTask>,
    pub mission: Option<MissionId>,
    /// Selected mission right after this action, read under the same lock.
    pub selected_mission: Option<MissionId>,
}

/// In-memory owner of a [`TrackerState`]. Actions are applied one at a time
/// under the write lock and the state is swapped only when the reducer succeeds.
pub struct TrackerService {
    state: RwLock<TrackerState>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    completion_sink: Option<Box<dyn CompletionSink>>,
}

pub struct TrackerServiceBuilder {
    state: TrackerState,
    clock: Option<Box<dyn Clock>>,
    ids: Option<Box<dyn IdGenerator>>,
    completion_sink: Option<Box<dyn CompletionSink>>,
}

impl TrackerServiceBuilder {
    pub fn new() -> Self {
        Self {
            state: TrackerState::default(),
            clock: None,
            ids: None,
            completion_sink: None,
        }
    }

    pub fn with_state(mut self, state: TrackerState) -> Self {
        self.state = state;
        self
    }

    pub fn with_roadmap(mut self, roadmap: Vec<DailyTask>) -> Self {
        self.state.roadmap = roadmap;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    pub fn with_completion_sink(mut self, sink: Box<dyn CompletionSink>) -> Self {
        self.completion_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TrackerService, TrackerError> {
        let mut state = self.state;
        state.validate()?;
        state.reconcile();
        Ok(TrackerService {
            state: RwLock::new(state),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            ids: self
                .ids
                .unwrap_or_else(|| Box::new(UlidGenerator::new(SystemClock))),
            completion_sink: self.completion_sink,
        })
    }
}

impl Default for TrackerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerService {
    pub fn builder() -> TrackerServiceBuilder {
        TrackerServiceBuilder::new()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Applies `action` and returns what it produced.
    #[instrument(skip(self, action), fields(action = action.name()))]
    pub fn dispatch(&self, action: Action) -> Result<Applied, TrackerError> {
        let now = self.clock.now();
        let applied = {
            let mut state = self.state.write();
            let transition = match reduce(&state, &action, now, self.ids.as_ref()) {
                Ok(transition) => transition,
                Err(err) => {
                    debug!(%err, "action rejected");
                    return Err(err);
                }
            };
            let selected_mission = transition.state.selected_mission.clone();
            *state = transition.state;
            Applied {
                just_completed: transition.just_completed,
                mission: transition.mission,
                selected_mission,
            }
        };

        if let Some(task) = &applied.just_completed {
            info!(day = task.day, "roadmap day completed");
            if let Some(sink) = &self.completion_sink {
                sink.celebrate(CompletionNotice::new(task, now));
            }
        }
        Ok(applied)
    }

    pub fn complete_sub_task(
        &self,
        day: u32,
        index: usize,
        completed: bool,
    ) -> Result<Option<DailyTask>, TrackerError> {
        self.dispatch(Action::CompleteSubTask {
            day,
            index,
            completed,
        })
        .map(|applied| applied.just_completed)
    }

    pub fn log_study(&self, day: u32, index: usize, seconds: u64) -> Result<(), TrackerError> {
        self.dispatch(Action::LogStudy {
            day,
            index,
            seconds,
        })
        .map(|_| ())
    }

    /// Submits a create or edit request and returns the id of the affected mission.
    pub fn submit_mission(&self, request: MissionRequest) -> Result<MissionId, TrackerError> {
        let action = Action::SubmitMission(request);
        let name = action.name();
        self.dispatch(action)?
            .mission
            .ok_or(TrackerError::MissingOutcome(name))
    }

    /// Deletes a mission and returns the selection the delete left behind.
    pub fn delete_mission(&self, id: &MissionId) -> Result<Option<MissionId>, TrackerError> {
        self.dispatch(Action::DeleteMission(id.clone()))
            .map(|applied| applied.selected_mission)
    }

    pub fn select_mission(&self, id: Option<MissionId>) -> Result<(), TrackerError> {
        self.dispatch(Action::SelectMission(id)).map(|_| ())
    }

    pub fn snapshot(&self) -> TrackerState {
        self.state.read().clone()
    }

    pub fn roadmap(&self) -> Vec<DailyTask> {
        self.state.read().roadmap.clone()
    }

    pub fn missions(&self) -> Vec<MissionTask> {
        self.state.read().missions.clone()
    }

    pub fn selected_mission(&self) -> Option<MissionId> {
        self.state.read().selected_mission.clone()
    }

    /// Time left for a mission, computed against the clock at call time.
    pub fn time_left(&self, id: &MissionId) -> Option<TimeLeft> {
        let now = self.clock.now();
        self.state
            .read()
            .mission(id)
            .map(|mission| mission.time_left(now))
    }

    pub fn carry_forward_warning(&self, current_day: u32, selected_day: u32) -> Vec<DailyTask> {
        let state = self.state.read();
        roadmap::carry_forward_warning(&state.roadmap, current_day, selected_day)
            .map(|tasks| tasks.into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn progress(&self) -> RoadmapProgress {
        RoadmapProgress::of(&self.state.read().roadmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mission::Deadline, ports::SequentialIds};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn state() -> TrackerState {
        TrackerState {
            roadmap: vec![DailyTask::new(1, "a; b"), DailyTask::new(2, "c")],
            ..TrackerState::default()
        }
    }

    #[test]
    fn reducer_leaves_the_input_state_alone() {
        let ids = SequentialIds::new("m");
        let before = state();
        let action = Action::CompleteSubTask {
            day: 2,
            index: 0,
            completed: true,
        };
        let transition = reduce(&before, &action, now(), &ids).expect("reduce");
        assert_eq!(before, state());
        assert!(transition.state.roadmap[1].completed);
        assert_eq!(transition.just_completed.map(|task| task.day), Some(2));
    }

    #[test]
    fn rejected_actions_surface_typed_errors() {
        let ids = SequentialIds::new("m");
        let err = reduce(
            &state(),
            &Action::LogStudy {
                day: 7,
                index: 0,
                seconds: 30,
            },
            now(),
            &ids,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Roadmap(crate::RoadmapError::DayNotFound(7))
        ));

        let err = reduce(
            &state(),
            &Action::SelectMission(Some(MissionId::from("missing"))),
            now(),
            &ids,
        )
        .unwrap_err();
        assert!(matches!(err, TrackerError::Mission(MissionError::NotFound(_))));
    }

    #[test]
    fn delete_updates_missions_and_selection_together() {
        let ids = SequentialIds::new("m");
        let mut current = state();
        for title in ["one", "two"] {
            let request = MissionRequest::new(title, Deadline::InDays("2".into()));
            current = reduce(&current, &Action::SubmitMission(request), now(), &ids)
                .expect("submit")
                .state;
        }
        current = reduce(
            &current,
            &Action::SelectMission(Some(MissionId::from("m-1"))),
            now(),
            &ids,
        )
        .expect("select")
        .state;

        let next = reduce(
            &current,
            &Action::DeleteMission(MissionId::from("m-1")),
            now(),
            &ids,
        )
        .expect("delete")
        .state;
        assert_eq!(next.missions.len(), 1);
        assert_eq!(next.selected_mission, Some(MissionId::from("m-2")));
        assert_eq!(next.roadmap, current.roadmap);
    }

    #[test]
    fn snapshots_reconcile_sub_tasks_on_load() {
        let raw = r#"{
            "roadmap": [
                { "day": 1, "task": "read ; write", "completed": true,
                  "subTasks": [ { "text": "read", "completed": false } ] }
            ],
            "missions": []
        }"#;
        let state = TrackerState::from_json(raw).expect("snapshot");
        let day = state.day(1).expect("day 1");
        assert_eq!(day.sub_tasks.len(), 2);
        assert!(!day.completed, "stored flag is recomputed");
        assert!(day.is_consistent());

        let bad = TrackerState::from_json(r#"{ "missions": [ { "priority": "urgent" } ] }"#);
        assert!(matches!(bad, Err(TrackerError::Snapshot(_))));
    }

    fn mission_json(id: &str) -> String {
        format!(
            r#"{{ "id": "{id}", "title": "t", "category": "General", "priority": "low",
                 "startDate": "2024-01-01T00:00:00", "targetDate": "2024-01-05T23:59:59.999" }}"#
        )
    }

    fn snapshot_error(raw: &str) -> Option<SnapshotError> {
        match TrackerState::from_json(raw) {
            Err(TrackerError::InvalidSnapshot(err)) => Some(err),
            _ => None,
        }
    }

    #[test]
    fn snapshots_with_broken_identity_are_rejected() {
        assert_eq!(
            snapshot_error(r#"{ "roadmap": [ { "day": 0, "task": "a" } ] }"#),
            Some(SnapshotError::ZeroDay)
        );
        assert_eq!(
            snapshot_error(
                r#"{ "roadmap": [ { "day": 2, "task": "x" }, { "day": 2, "task": "y" } ] }"#
            ),
            Some(SnapshotError::DuplicateDay(2))
        );
        let duplicated = format!(
            r#"{{ "missions": [ {}, {} ] }}"#,
            mission_json("dup"),
            mission_json("dup")
        );
        assert_eq!(
            snapshot_error(&duplicated),
            Some(SnapshotError::DuplicateMissionId(MissionId::from("dup")))
        );
        let dangling = format!(
            r#"{{ "missions": [ {} ], "selectedMission": "gone" }}"#,
            mission_json("kept")
        );
        assert_eq!(
            snapshot_error(&dangling),
            Some(SnapshotError::UnknownSelection(MissionId::from("gone")))
        );

        let valid = format!(
            r#"{{ "roadmap": [ {{ "day": 1, "task": "a" }}, {{ "day": 2, "task": "b" }} ],
                 "missions": [ {}, {} ], "selectedMission": "two" }}"#,
            mission_json("one"),
            mission_json("two")
        );
        assert!(TrackerState::from_json(&valid).is_ok());
    }

    #[test]
    fn builder_refuses_duplicate_days() {
        let built = TrackerService::builder()
            .with_roadmap(vec![DailyTask::new(3, "x"), DailyTask::new(3, "y")])
            .build();
        assert!(matches!(
            built,
            Err(TrackerError::InvalidSnapshot(SnapshotError::DuplicateDay(3)))
        ));
    }

    #[test]
    fn delete_reports_the_selection_it_computed() {
        let service = TrackerService::builder()
            .with_clock(crate::ports::FixedClock::new(now()))
            .with_id_generator(SequentialIds::new("m"))
            .build()
            .expect("service");
        let first = service
            .submit_mission(MissionRequest::new("one", Deadline::InDays("1".into())))
            .expect("one");
        let second = service
            .submit_mission(MissionRequest::new("two", Deadline::InDays("2".into())))
            .expect("two");
        let applied = service
            .dispatch(Action::SelectMission(Some(first.clone())))
            .expect("select");
        assert_eq!(applied.selected_mission, Some(first.clone()));

        let applied = service
            .dispatch(Action::DeleteMission(first))
            .expect("delete");
        assert_eq!(applied.selected_mission, Some(second.clone()));
        assert_eq!(service.delete_mission(&second).expect("delete"), None);
    }

    #[test]
    fn submit_goes_through_the_reducer() {
        let service = TrackerService::builder()
            .with_clock(crate::ports::FixedClock::new(now()))
            .with_id_generator(SequentialIds::new("m"))
            .build()
            .expect("service");
        let applied = service
            .dispatch(Action::SubmitMission(MissionRequest::new(
                "one",
                Deadline::InDays("1".into()),
            )))
            .expect("submit");
        assert_eq!(applied.mission, Some(MissionId::from("m-1")));
        assert_eq!(
            service
                .submit_mission(MissionRequest::new("two", Deadline::InDays("1".into())))
                .expect("submit"),
            MissionId::from("m-2")
        );
        let err = service
            .submit_mission(MissionRequest::new("", Deadline::InDays("1".into())))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Mission(MissionError::EmptyTitle)));
        assert_eq!(service.missions().len(), 2);
    }
}
