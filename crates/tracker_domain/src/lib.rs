pub mod countdown;
pub mod error;
pub mod mission;
pub mod notifications;
pub mod ports;
pub mod roadmap;
pub mod service;
pub mod study;

pub use crate::error::{MissionError, RoadmapError, SnapshotError, TrackerError};
pub use crate::service::{TrackerService, TrackerServiceBuilder, TrackerState};
