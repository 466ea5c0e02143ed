// src/error.rs
//! Error types for the activity tracker

use crate::recording::RecordingState;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Location failures surfaced to the user. None of these stop tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Geolocation is not supported by this device")]
    Unsupported,
    #[error("Location permission denied. Please enable location access.")]
    PermissionDenied,
    #[error("Location information is unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
}

impl LocationError {
    /// Map an I/O failure from a receiver connection to the closest location error.
    pub fn from_io(error: &std::io::Error) -> Self {
        Self::from_io_kind(error.kind())
    }

    fn from_io_kind(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::PermissionDenied => LocationError::PermissionDenied,
            std::io::ErrorKind::TimedOut => LocationError::Timeout,
            _ => LocationError::PositionUnavailable,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid activity: {0}")]
    InvalidActivity(String),
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: RecordingState,
    },
    #[error("Error: {0}")]
    Other(String),
}

impl TrackerError {
    /// How a failure to open or read a receiver looks to the user
    pub fn location_error(&self) -> LocationError {
        match self {
            TrackerError::Io(e) => LocationError::from_io(e),
            TrackerError::Serial(e) => match e.kind {
                tokio_serial::ErrorKind::Io(kind) => LocationError::from_io_kind(kind),
                _ => LocationError::PositionUnavailable,
            },
            TrackerError::Location(e) => *e,
            _ => LocationError::PositionUnavailable,
        }
    }
}
