//! Attendance: the engine facade and its in-memory sightings

pub mod engine;
pub mod status;

pub use engine::AttendanceEngine;
pub use status::StatusCache;

use std::time::SystemTime;

/// A member observed present at `seen_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendance {
    pub name: String,
    pub seen_at: SystemTime,
}
