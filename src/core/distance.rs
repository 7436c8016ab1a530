use crate::models::GeoPoint;
use geo::{HaversineDistance, Point};

/// Great-circle distance between two points in kilometers
///
/// Uses the haversine formula (mean earth radius), which is accurate to well
/// under a percent at city scale.
#[inline]
pub fn distance_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let a = Point::new(from.lon, from.lat);
    let b = Point::new(to.lon, to.lat);
    a.haversine_distance(&b) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let seoul = GeoPoint { lat: 37.5665, lon: 126.9780 };
        assert!(distance_km(&seoul, &seoul) < 0.001);
    }

    #[test]
    fn test_seoul_to_busan() {
        // City hall to city hall is roughly 325 km
        let seoul = GeoPoint { lat: 37.5665, lon: 126.9780 };
        let busan = GeoPoint { lat: 35.1796, lon: 129.0756 };

        let distance = distance_km(&seoul, &busan);
        assert!((distance - 325.0).abs() < 10.0, "Distance should be ~325km, got {}", distance);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint { lat: 37.5665, lon: 126.9780 };
        let b = GeoPoint { lat: 37.5796, lon: 126.9770 };
        assert!((distance_km(&a, &b) - distance_km(&b, &a)).abs() < 1e-9);
    }
}
