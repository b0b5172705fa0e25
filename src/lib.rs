//! atnd - Attendance tracking for a lab chat bot
//!
//! Keeps a small registry of members and their Bluetooth hardware addresses,
//! and answers "who is around right now" by probing those addresses with
//! `l2ping`.
//!
//! Key principles:
//! - Addresses are encrypted at rest (AES-256-GCM) and never logged
//! - One radio probe at a time, one roster sweep at a time
//! - Every blocking operation honors a cancellation token and a deadline
//! - Sightings live in memory only and reset on restart

pub mod attendance;
pub mod context;
pub mod crypto;
pub mod error;
pub mod probe;
pub mod registry;
pub mod storage;

pub use attendance::{Attendance, AttendanceEngine};
pub use context::OpContext;
pub use error::{AtndError, AtndResult};
