// src/metrics/format.rs
//! Display strings for activity metrics. Lossy; never parse these back.

use chrono::{DateTime, Local, Utc};

/// `H:MM:SS` from one hour upwards, `MM:SS` below
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub fn format_distance(meters: f64) -> String {
    let rounded = meters.round();
    if rounded < 1000.0 {
        format!("{} m", rounded as i64)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Minutes and seconds per kilometre
pub fn format_pace(distance_meters: f64, duration_seconds: u64) -> String {
    if distance_meters <= 0.0 || duration_seconds == 0 {
        return "--:--".to_string();
    }

    let seconds_per_km = (duration_seconds as f64 / (distance_meters / 1000.0)).round() as u64;
    format!("{}:{:02} /km", seconds_per_km / 60, seconds_per_km % 60)
}

pub fn format_speed(meters_per_second: f64) -> String {
    format!("{:.1} km/h", meters_per_second * 3.6)
}

pub fn format_elevation(meters: f64) -> String {
    format!("{} m", meters.round() as i64)
}

pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%a, %b %-d, %Y").to_string()
}

pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
