// src/recording/tracker.rs
//! Accumulates a position feed into an ordered route

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::error::LocationError;
use crate::gps::{Fix, FixSink, PositionEvent, PositionSource, WatchHandle};
use crate::sync::lock;

#[derive(Debug, Default)]
struct TrackingState {
    samples: Vec<Fix>,
    current: Option<Fix>,
    error: Option<LocationError>,
    tracking: bool,
    paused: bool,
}

impl TrackingState {
    fn apply(&mut self, event: PositionEvent) {
        match event {
            Ok(fix) => {
                if self.tracking && !self.paused {
                    self.samples.push(fix.clone());
                }
                self.current = Some(fix);
            }
            Err(error) => {
                warn!("Location error: {}", error);
                self.error = Some(error);
            }
        }
    }
}

/// Turns a [`PositionSource`] into an in-memory route plus a live position.
///
/// Every reading updates the live position, paused or not. Readings are
/// appended to the route only while tracking and not paused. Location
/// failures are surfaced through [`error`](Self::error) and never stop
/// tracking.
pub struct PositionTracker {
    source: Arc<dyn PositionSource>,
    state: Arc<Mutex<TrackingState>>,
    watch: Option<WatchHandle>,
}

impl PositionTracker {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(TrackingState::default())),
            watch: None,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    fn sink(&self) -> FixSink {
        let state = Arc::clone(&self.state);
        FixSink::new(move |event| {
            if let Ok(fix) = &event {
                debug!("fix {:.6},{:.6}", fix.latitude, fix.longitude);
            }
            lock(&state).apply(event);
        })
    }

    /// Begin a fresh route: one immediate position request, then a continuous watch
    pub fn start(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.cancel();
        }

        {
            let mut state = lock(&self.state);
            state.samples.clear();
            state.error = None;
            state.tracking = true;
            state.paused = false;
        }

        info!("Starting position tracking via {}", self.source.name());
        self.source.current_position(self.sink());

        match self.source.watch_position(self.sink()) {
            Ok(watch) => self.watch = Some(watch),
            Err(error) => lock(&self.state).apply(Err(error)),
        }
    }

    pub fn pause(&mut self) {
        lock(&self.state).paused = true;
    }

    pub fn resume(&mut self) {
        lock(&self.state).paused = false;
    }

    /// End observation and hand back the route
    pub fn stop(&mut self) -> Vec<Fix> {
        if let Some(watch) = self.watch.take() {
            watch.cancel();
        }

        let mut state = lock(&self.state);
        state.tracking = false;
        state.paused = false;
        info!("Stopped position tracking with {} samples", state.samples.len());
        state.samples.clone()
    }

    pub fn clear_error(&mut self) {
        lock(&self.state).error = None;
    }

    pub fn is_tracking(&self) -> bool {
        lock(&self.state).tracking
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    pub fn current_position(&self) -> Option<Fix> {
        lock(&self.state).current.clone()
    }

    pub fn error(&self) -> Option<LocationError> {
        lock(&self.state).error
    }

    pub fn samples(&self) -> Vec<Fix> {
        lock(&self.state).samples.clone()
    }

    pub fn sample_count(&self) -> usize {
        lock(&self.state).samples.len()
    }
}
