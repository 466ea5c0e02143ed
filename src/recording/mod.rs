// src/recording/mod.rs
//! Live activity recording

pub mod recorder;
pub mod timer;
pub mod tracker;

pub use recorder::{summarize, Recorder, RecordingSnapshot, RecordingState};
pub use timer::ElapsedTimer;
pub use tracker::PositionTracker;
