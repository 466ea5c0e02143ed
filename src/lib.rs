// src/lib.rs
//! Sports Tracker Library
//!
//! Records GPS-tracked workouts from gpsd, a serial NMEA receiver or a
//! replayed NMEA log, stores them in SQLite, and derives statistics,
//! goal progress, backups and route exports from the stored activities.

pub mod config;
pub mod display;
pub mod error;
pub mod goals;
pub mod gps;
pub mod metrics;
pub mod models;
pub mod recording;
pub mod stats;
pub mod store;
pub mod transfer;

mod sync;

// Re-export main types for convenience
pub use config::TrackerConfig;
pub use error::{LocationError, Result, TrackerError};
pub use goals::{Goal, GoalPeriod, GoalType};
pub use gps::{Fix, ManualSource, PositionSource};
pub use models::{Activity, ActivityDetails, ActivityUpdate, GpsPoint, SportType};
pub use recording::{Recorder, RecordingState};
pub use store::{ActivityStore, Database, MemoryStore};
