// src/recording/timer.rs
//! Active-time accumulation across pauses

use std::time::Instant;

/// Counts active whole seconds over start/pause/resume/stop cycles.
///
/// Each closed segment contributes its floored length, so up to one second
/// per pause can be lost.
#[derive(Debug, Clone, Default)]
pub struct ElapsedTimer {
    accumulated_secs: u64,
    segment_start: Option<Instant>,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.segment_start.is_some()
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        self.accumulated_secs = 0;
        self.segment_start = Some(now);
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        self.fold_segment(now);
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    pub fn resume_at(&mut self, now: Instant) {
        if self.segment_start.is_none() {
            self.segment_start = Some(now);
        }
    }

    /// Close any open segment and return the total. State is kept until [`reset`](Self::reset).
    pub fn stop(&mut self) -> u64 {
        self.stop_at(Instant::now())
    }

    pub fn stop_at(&mut self, now: Instant) -> u64 {
        self.fold_segment(now);
        self.accumulated_secs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Seconds so far, including the open segment
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs_at(Instant::now())
    }

    pub fn elapsed_secs_at(&self, now: Instant) -> u64 {
        let open = self
            .segment_start
            .map_or(0, |start| now.saturating_duration_since(start).as_secs());
        self.accumulated_secs.saturating_add(open)
    }

    fn fold_segment(&mut self, now: Instant) {
        if let Some(start) = self.segment_start.take() {
            let segment = now.saturating_duration_since(start).as_secs();
            self.accumulated_secs = self.accumulated_secs.saturating_add(segment);
        }
    }
}
