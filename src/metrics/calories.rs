// src/metrics/calories.rs
//! Calorie estimation

use crate::models::SportType;

pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// MET used for sports without a dedicated table entry
pub const DEFAULT_MET: f64 = 5.0;

/// Metabolic equivalent for a sustained effort in the given sport
pub fn met_value(sport: SportType) -> f64 {
    match sport {
        SportType::Running => 9.8,
        SportType::Cycling => 7.5,
        SportType::Walking => 3.5,
        SportType::Hiking => 6.0,
        SportType::Swimming => 6.0,
        SportType::Other => DEFAULT_MET,
    }
}

/// kcal per kg per km for sports estimated from distance
fn distance_factor(sport: SportType) -> Option<f64> {
    match sport {
        SportType::Running => Some(1.0),
        SportType::Walking => Some(0.5),
        _ => None,
    }
}

/// Estimated kcal burned, rounded to the nearest whole calorie.
///
/// Running and walking scale with distance; every other sport uses
/// `MET x weight x hours`.
pub fn calorie_estimate(
    sport: SportType,
    distance_meters: f64,
    duration_seconds: u64,
    weight_kg: f64,
) -> u32 {
    let kcal = match distance_factor(sport) {
        Some(factor) => weight_kg * (distance_meters / 1000.0) * factor,
        None => met_value(sport) * weight_kg * (duration_seconds as f64 / 3600.0),
    };

    if kcal.is_finite() {
        kcal.max(0.0).round() as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_uses_distance() {
        assert_eq!(calorie_estimate(SportType::Running, 5000.0, 1800, DEFAULT_WEIGHT_KG), 350);
        // Duration is irrelevant for the distance heuristic
        assert_eq!(calorie_estimate(SportType::Running, 5000.0, 99_999, DEFAULT_WEIGHT_KG), 350);
    }

    #[test]
    fn test_walking_uses_half_factor() {
        assert_eq!(calorie_estimate(SportType::Walking, 4000.0, 3600, DEFAULT_WEIGHT_KG), 140);
    }

    #[test]
    fn test_swimming_uses_met_table() {
        assert_eq!(calorie_estimate(SportType::Swimming, 0.0, 3600, DEFAULT_WEIGHT_KG), 420);
    }

    #[test]
    fn test_other_uses_default_met() {
        assert_eq!(calorie_estimate(SportType::Other, 0.0, 1800, 80.0), 200);
    }

    #[test]
    fn test_zero_inputs() {
        assert_eq!(calorie_estimate(SportType::Cycling, 0.0, 0, DEFAULT_WEIGHT_KG), 0);
        assert_eq!(calorie_estimate(SportType::Running, 0.0, 600, DEFAULT_WEIGHT_KG), 0);
    }
}
