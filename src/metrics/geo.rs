// src/metrics/geo.rs
//! Route geometry on WGS84 coordinates.
//!
//! All functions are pure and work on anything implementing [`Coordinate`],
//! so device fixes, stored samples and plain `(lat, lon)` tuples share one
//! implementation.

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point with latitude and longitude in degrees
pub trait Coordinate {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

impl Coordinate for (f64, f64) {
    fn latitude(&self) -> f64 {
        self.0
    }

    fn longitude(&self) -> f64 {
        self.1
    }
}

impl<T: Coordinate + ?Sized> Coordinate for &T {
    fn latitude(&self) -> f64 {
        (**self).latitude()
    }

    fn longitude(&self) -> f64 {
        (**self).longitude()
    }
}

/// Great-circle distance in meters between two points
pub fn distance<A: Coordinate, B: Coordinate>(a: &A, b: &B) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of consecutive segment lengths; 0 for fewer than two points
pub fn path_distance<P: Coordinate>(points: &[P]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance(&pair[0], &pair[1]))
        .sum()
}

/// Total climb and descent in meters as `(gain, loss)`.
///
/// Missing readings are skipped rather than treated as zero, so only the
/// reported subsequence contributes.
pub fn elevation_delta<I>(elevations: I) -> (f64, f64)
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut previous: Option<f64> = None;

    for elevation in elevations.into_iter().flatten() {
        if let Some(prev) = previous {
            let diff = elevation - prev;
            if diff > 0.0 {
                gain += diff;
            } else {
                loss += -diff;
            }
        }
        previous = Some(elevation);
    }

    (gain, loss)
}

/// `[[min_lat, min_lon], [max_lat, max_lon]]`, or `None` for an empty route
pub fn bounding_box<P: Coordinate>(points: &[P]) -> Option<[[f64; 2]; 2]> {
    let first = points.first()?;
    let mut min = [first.latitude(), first.longitude()];
    let mut max = min;

    for point in &points[1..] {
        min[0] = min[0].min(point.latitude());
        min[1] = min[1].min(point.longitude());
        max[0] = max[0].max(point.latitude());
        max[1] = max[1].max(point.longitude());
    }

    Some([min, max])
}

/// Arithmetic mean of the coordinates. An empty route yields `[0.0, 0.0]`.
pub fn center<P: Coordinate>(points: &[P]) -> [f64; 2] {
    if points.is_empty() {
        return [0.0, 0.0];
    }

    let count = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude()).sum::<f64>() / count;
    let lon = points.iter().map(|p| p.longitude()).sum::<f64>() / count;
    [lat, lon]
}
