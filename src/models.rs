// src/models.rs
//! Activity and GPS sample records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportType {
    Running,
    Cycling,
    Walking,
    Hiking,
    Swimming,
    Other,
}

impl SportType {
    pub const ALL: [SportType; 6] = [
        SportType::Running,
        SportType::Cycling,
        SportType::Walking,
        SportType::Hiking,
        SportType::Swimming,
        SportType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Running => "running",
            SportType::Cycling => "cycling",
            SportType::Walking => "walking",
            SportType::Hiking => "hiking",
            SportType::Swimming => "swimming",
            SportType::Other => "other",
        }
    }

    /// Human readable name, also used as the default activity title
    pub fn label(&self) -> &'static str {
        match self {
            SportType::Running => "Running",
            SportType::Cycling => "Cycling",
            SportType::Walking => "Walking",
            SportType::Hiking => "Hiking",
            SportType::Swimming => "Swimming",
            SportType::Other => "Other",
        }
    }
}

impl Default for SportType {
    fn default() -> Self {
        SportType::Running
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportType {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SportType::ALL
            .into_iter()
            .find(|sport| sport.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| TrackerError::Parse(format!("unknown sport type '{}'", value)))
    }
}

/// One recorded or imported exercise session with its summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub sport_type: SportType,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub calories: Option<u32>,
    pub notes: Option<String>,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub avg_speed_mps: Option<f64>,
    pub max_speed_mps: Option<f64>,
}

impl Activity {
    /// Check the record-level invariants every stored activity satisfies
    pub fn validate(&self) -> Result<(), TrackerError> {
        let invalid = |reason: String| -> Result<(), TrackerError> {
            Err(TrackerError::InvalidActivity(reason))
        };

        if self.id.trim().is_empty() {
            return invalid("id is empty".to_string());
        }
        if self.ended_at < self.started_at {
            return invalid(format!(
                "ended_at {} is before started_at {}",
                self.ended_at, self.started_at
            ));
        }
        if !(self.distance_meters.is_finite() && self.distance_meters >= 0.0) {
            return invalid(format!("distance_meters {} is negative", self.distance_meters));
        }

        let optional = [
            ("elevation_gain", self.elevation_gain),
            ("elevation_loss", self.elevation_loss),
            ("avg_speed_mps", self.avg_speed_mps),
            ("max_speed_mps", self.max_speed_mps),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                if !(value.is_finite() && value >= 0.0) {
                    return invalid(format!("{} {} is negative", field, value));
                }
            }
        }

        Ok(())
    }

    /// Average pace in seconds per kilometre
    pub fn pace_seconds_per_km(&self) -> Option<f64> {
        if self.distance_meters > 0.0 && self.duration_seconds > 0 {
            Some(self.duration_seconds as f64 / (self.distance_meters / 1000.0))
        } else {
            None
        }
    }
}

/// One timestamped location reading owned by an activity.
///
/// The store keeps its own row key for each sample; it never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub activity_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub speed_mps: Option<f64>,
    pub accuracy_meters: Option<f64>,
}

/// User-editable fields of a stored activity. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityUpdate {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
}

impl ActivityUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.notes.is_none()
    }
}

/// Choices made by the user when saving a finished recording
#[derive(Debug, Clone, Default)]
pub struct ActivityDetails {
    pub sport: SportType,
    pub title: Option<String>,
    pub notes: Option<String>,
}

impl ActivityDetails {
    pub fn new(sport: SportType) -> Self {
        Self {
            sport,
            title: None,
            notes: None,
        }
    }

    pub fn resolved_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.sport.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity() -> Activity {
        let start = DateTime::parse_from_rfc3339("2024-03-03T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Activity {
            id: "a1".to_string(),
            title: "Running".to_string(),
            sport_type: SportType::Running,
            started_at: start,
            ended_at: start + chrono::Duration::seconds(1800),
            distance_meters: 5000.0,
            duration_seconds: 1800,
            calories: Some(400),
            notes: None,
            elevation_gain: Some(12.0),
            elevation_loss: Some(0.0),
            avg_speed_mps: Some(2.8),
            max_speed_mps: None,
        }
    }

    #[test]
    fn test_validate_accepts_consistent_activity() {
        assert!(activity().validate().is_ok());

        let mut instant = activity();
        instant.ended_at = instant.started_at;
        instant.distance_meters = 0.0;
        assert!(instant.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_broken_invariants() {
        let mut backwards = activity();
        backwards.ended_at = backwards.started_at - chrono::Duration::hours(1);
        assert!(matches!(backwards.validate(), Err(TrackerError::InvalidActivity(_))));

        let mut negative = activity();
        negative.distance_meters = -500.0;
        assert!(negative.validate().is_err());

        let mut not_a_number = activity();
        not_a_number.distance_meters = f64::NAN;
        assert!(not_a_number.validate().is_err());

        let mut descent = activity();
        descent.elevation_loss = Some(-3.0);
        assert!(descent.validate().is_err());

        let mut blank = activity();
        blank.id = " ".to_string();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_sport_type_parsing() {
        assert_eq!("running".parse::<SportType>().unwrap(), SportType::Running);
        assert_eq!(" Hiking ".parse::<SportType>().unwrap(), SportType::Hiking);
        assert!("gym".parse::<SportType>().is_err());
    }

    #[test]
    fn test_sport_type_serializes_lowercase() {
        let json = serde_json::to_string(&SportType::Swimming).unwrap();
        assert_eq!(json, "\"swimming\"");
    }

    #[test]
    fn test_default_title_is_sport_label() {
        let details = ActivityDetails::new(SportType::Cycling);
        assert_eq!(details.resolved_title(), "Cycling");

        let blank = ActivityDetails {
            title: Some("   ".to_string()),
            ..ActivityDetails::new(SportType::Walking)
        };
        assert_eq!(blank.resolved_title(), "Walking");

        let named = ActivityDetails {
            title: Some("Lunch loop".to_string()),
            ..ActivityDetails::new(SportType::Running)
        };
        assert_eq!(named.resolved_title(), "Lunch loop");
    }
}
