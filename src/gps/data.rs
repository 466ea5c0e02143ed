// src/gps/data.rs
//! GPS data structures and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::Coordinate;
use crate::models::GpsPoint;

/// Typical user equivalent range error; horizontal accuracy is HDOP times this
pub const UERE_METERS: f64 = 5.0;

/// One position reading delivered by a location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,   // meters
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,      // m/s
    pub accuracy: Option<f64>,   // meters
    #[serde(default)]
    pub satellites: Option<u8>,  // used in the solution
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            timestamp,
            speed: None,
            accuracy: None,
            satellites: None,
        }
    }

    /// Attach this reading to an activity as a stored sample
    pub fn to_gps_point(&self, activity_id: &str) -> GpsPoint {
        GpsPoint {
            activity_id: activity_id.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            elevation_meters: self.altitude,
            timestamp: self.timestamp,
            speed_mps: self.speed,
            accuracy_meters: self.accuracy,
        }
    }
}

impl Coordinate for Fix {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Coordinate for GpsPoint {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Running parse state of a receiver feed. Sentences update individual
/// fields; a [`Fix`] is taken once latitude and longitude are known.
#[derive(Debug, Clone, Default)]
pub struct GpsData {
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,      // m/s
    pub satellites: Option<u8>,
    pub fix_quality: Option<u8>,
    pub hdop: Option<f64>,
    pub mode: Option<u8>,
    pub accuracy: Option<f64>,   // meters
}

impl GpsData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the GPS data represents a valid position fix
    pub fn has_fix(&self) -> bool {
        let position_known = self.latitude.is_some() && self.longitude.is_some();
        let quality_ok = self.fix_quality.map_or(true, |q| q > 0);
        let mode_ok = self.mode.map_or(true, |m| m >= 2);
        position_known && quality_ok && mode_ok
    }

    /// Update the timestamp to now
    pub fn update_timestamp(&mut self) {
        self.timestamp = Some(Utc::now());
    }

    /// Snapshot the current state as a fix, if there is one
    pub fn to_fix(&self) -> Option<Fix> {
        if !self.has_fix() {
            return None;
        }

        Some(Fix {
            latitude: self.latitude?,
            longitude: self.longitude?,
            altitude: self.altitude,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            speed: self.speed,
            accuracy: self.accuracy.or_else(|| self.hdop.map(|hdop| hdop * UERE_METERS)),
            satellites: self.satellites,
        })
    }
}
