// src/recording/recorder.rs
//! Recording lifecycle: idle -> recording <-> paused -> saving -> idle

use std::{fmt, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{timer::ElapsedTimer, tracker::PositionTracker};
use crate::{
    error::{LocationError, Result, TrackerError},
    gps::{Fix, PositionSource},
    metrics::{calorie_estimate, elevation_delta, path_distance, DEFAULT_WEIGHT_KG},
    models::{Activity, ActivityDetails, GpsPoint},
    store::ActivityStore,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Paused,
    /// Stopped; the snapshot awaits save or discard
    Saving,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Saving => "saving",
        };
        f.write_str(name)
    }
}

/// Route and active time captured at stop, before save or discard
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSnapshot {
    samples: Vec<Fix>,
    elapsed_seconds: u64,
}

impl RecordingSnapshot {
    pub fn new(samples: Vec<Fix>, elapsed_seconds: u64) -> Self {
        Self {
            samples,
            elapsed_seconds,
        }
    }

    pub fn samples(&self) -> &[Fix] {
        &self.samples
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn distance_meters(&self) -> f64 {
        path_distance(&self.samples)
    }
}

/// Reduce a stopped recording into the activity record and its samples.
///
/// With no samples the activity starts and ends at `now`.
pub fn summarize(
    snapshot: &RecordingSnapshot,
    details: &ActivityDetails,
    weight_kg: f64,
    id: String,
    now: DateTime<Utc>,
) -> (Activity, Vec<GpsPoint>) {
    let samples = snapshot.samples();
    let seconds = snapshot.elapsed_seconds();
    let distance = path_distance(samples);
    let (gain, loss) = elevation_delta(samples.iter().map(|fix| fix.altitude));

    let started_at = samples.first().map_or(now, |fix| fix.timestamp);
    let ended_at = samples.last().map_or(now, |fix| fix.timestamp).max(started_at);

    let avg_speed = if seconds > 0 {
        Some(distance / seconds as f64)
    } else {
        None
    };
    let max_speed = if samples.is_empty() {
        None
    } else {
        Some(
            samples
                .iter()
                .map(|fix| fix.speed.unwrap_or(0.0))
                .fold(0.0_f64, f64::max),
        )
    };

    let activity = Activity {
        title: details.resolved_title(),
        sport_type: details.sport,
        started_at,
        ended_at,
        distance_meters: distance,
        duration_seconds: seconds,
        calories: Some(calorie_estimate(details.sport, distance, seconds, weight_kg)),
        notes: details.notes.clone().filter(|notes| !notes.trim().is_empty()),
        elevation_gain: Some(gain),
        elevation_loss: Some(loss),
        avg_speed_mps: avg_speed,
        max_speed_mps: max_speed,
        id,
    };

    let points = samples
        .iter()
        .map(|fix| fix.to_gps_point(&activity.id))
        .collect();

    (activity, points)
}

/// Drives a [`PositionTracker`] and an [`ElapsedTimer`] in lockstep and
/// persists the result.
pub struct Recorder {
    state: RecordingState,
    tracker: PositionTracker,
    timer: ElapsedTimer,
    snapshot: Option<RecordingSnapshot>,
    weight_kg: f64,
}

impl Recorder {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            state: RecordingState::Idle,
            tracker: PositionTracker::new(source),
            timer: ElapsedTimer::new(),
            snapshot: None,
            weight_kg: DEFAULT_WEIGHT_KG,
        }
    }

    /// Body weight used for calorie estimates
    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = weight_kg;
        self
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn source_name(&self) -> &str {
        self.tracker.source_name()
    }

    fn require(&self, allowed: &[RecordingState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TrackerError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.start_at(Instant::now())
    }

    /// The timer runs even when the position source cannot start
    pub fn start_at(&mut self, now: Instant) -> Result<()> {
        self.require(&[RecordingState::Idle], "start")?;
        self.tracker.start();
        self.timer.start_at(now);
        self.state = RecordingState::Recording;
        info!("Recording started via {}", self.tracker.source_name());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> Result<()> {
        self.require(&[RecordingState::Recording], "pause")?;
        self.tracker.pause();
        self.timer.pause_at(now);
        self.state = RecordingState::Paused;
        info!("Recording paused at {}s", self.timer.elapsed_secs_at(now));
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> Result<()> {
        self.require(&[RecordingState::Paused], "resume")?;
        self.tracker.resume();
        self.timer.resume_at(now);
        self.state = RecordingState::Recording;
        info!("Recording resumed");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<&RecordingSnapshot> {
        self.stop_at(Instant::now())
    }

    pub fn stop_at(&mut self, now: Instant) -> Result<&RecordingSnapshot> {
        self.require(&[RecordingState::Recording, RecordingState::Paused], "stop")?;
        let samples = self.tracker.stop();
        let elapsed = self.timer.stop_at(now);
        self.state = RecordingState::Saving;
        info!(
            "Recording stopped: {} samples over {}s",
            samples.len(),
            elapsed
        );
        Ok(self.snapshot.insert(RecordingSnapshot::new(samples, elapsed)))
    }

    pub fn snapshot(&self) -> Option<&RecordingSnapshot> {
        self.snapshot.as_ref()
    }

    /// Persist the stopped recording and return to idle.
    ///
    /// A failed write leaves the recorder in `Saving` with the snapshot
    /// intact, so the caller can retry or discard.
    pub async fn save<S: ActivityStore>(
        &mut self,
        store: &S,
        details: ActivityDetails,
    ) -> Result<Activity> {
        self.require(&[RecordingState::Saving], "save")?;
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| TrackerError::Other("no stopped recording to save".to_string()))?;

        let (activity, points) = summarize(
            snapshot,
            &details,
            self.weight_kg,
            Uuid::new_v4().to_string(),
            Utc::now(),
        );

        store.add_activity_with_samples(&activity, &points).await?;
        info!(
            "Saved activity {} ({}, {:.0} m, {} samples)",
            activity.id,
            activity.sport_type,
            activity.distance_meters,
            points.len()
        );

        self.finish();
        Ok(activity)
    }

    /// The activity a save would write now, under a fresh id, or `None`
    /// when nothing is stopped.
    pub fn pending_activity(
        &self,
        details: &ActivityDetails,
    ) -> Option<(Activity, Vec<GpsPoint>)> {
        if self.state != RecordingState::Saving {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;
        Some(summarize(
            snapshot,
            details,
            self.weight_kg,
            Uuid::new_v4().to_string(),
            Utc::now(),
        ))
    }

    pub fn discard(&mut self) -> Result<()> {
        self.require(&[RecordingState::Saving], "discard")?;
        info!("Recording discarded");
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        self.snapshot = None;
        self.timer.reset();
        self.state = RecordingState::Idle;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_secs()
    }

    pub fn elapsed_seconds_at(&self, now: Instant) -> u64 {
        self.timer.elapsed_secs_at(now)
    }

    /// Route length so far
    pub fn distance_meters(&self) -> f64 {
        match &self.snapshot {
            Some(snapshot) => snapshot.distance_meters(),
            None => path_distance(&self.tracker.samples()),
        }
    }

    pub fn sample_count(&self) -> usize {
        match &self.snapshot {
            Some(snapshot) => snapshot.samples().len(),
            None => self.tracker.sample_count(),
        }
    }

    pub fn current_position(&self) -> Option<Fix> {
        self.tracker.current_position()
    }

    pub fn location_error(&self) -> Option<LocationError> {
        self.tracker.error()
    }

    pub fn clear_location_error(&mut self) {
        self.tracker.clear_error();
    }
}
