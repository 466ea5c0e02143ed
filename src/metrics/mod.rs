// src/metrics/mod.rs
//! Derived activity metrics: route geometry, calorie estimates and display formatting

pub mod calories;
pub mod format;
pub mod geo;

pub use calories::{calorie_estimate, met_value, DEFAULT_WEIGHT_KG};
pub use format::{
    format_date, format_distance, format_duration, format_elevation, format_pace, format_speed,
    format_time,
};
pub use geo::{bounding_box, center, distance, elevation_delta, path_distance, Coordinate, EARTH_RADIUS_M};
