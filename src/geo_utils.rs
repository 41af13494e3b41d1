//! # Geographic Utilities
//!
//! Distance and coordinate helpers shared by the proximity detector and the
//! route recorder.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`path_length`] | Total length of a recorded path in meters |
//! | [`search_half_widths`] | Degree box enclosing a radius, for index queries |
//! | [`offset_meters`] | Move a point a given number of meters north/east |
//!
//! All functions expect WGS84 coordinates in degrees. The ranges used by the
//! tracker are at most a few hundred meters, where the spherical haversine
//! model is accurate to well under a meter.

use geo::{Distance, Haversine, Point};

use crate::GeoPoint;

/// Meters per degree of latitude on the haversine sphere (mean radius 6,371,008.8 m).
const METERS_PER_DEGREE: f64 = 111_195.08;

const ENVELOPE_PAD: f64 = 1.001;
const ENVELOPE_EPS: f64 = 1e-9;

/// Great-circle distance between two points in meters.
///
/// # Example
///
/// ```rust
/// use route_tracker::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(23.8103, 90.4125);
/// let b = GeoPoint::new(23.8112, 90.4125);
///
/// let distance = geo_utils::haversine_distance(&a, &b);
/// assert!((distance - 100.0).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let p1 = Point::new(a.lng, a.lat);
    let p2 = Point::new(b.lng, b.lat);
    Haversine::distance(p1, p2)
}

/// Total length of a path in meters. Empty or single-point paths return 0.0.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Half-widths in degrees `(lat, lng)` of a box that contains every point
/// within `meters` of a point at `latitude`.
///
/// The latitude half-width is the cap's angular radius. The longitude
/// half-width is the exact extent of a spherical cap, `asin(sin d / cos lat)`;
/// it is 180 when the cap reaches a pole. Both carry a small pad for rounding.
pub fn search_half_widths(meters: f64, latitude: f64) -> (f64, f64) {
    let lat_deg = meters / METERS_PER_DEGREE;
    if latitude.abs() + lat_deg >= 90.0 {
        return (lat_deg * ENVELOPE_PAD + ENVELOPE_EPS, 180.0);
    }

    let ratio = lat_deg.to_radians().sin() / latitude.to_radians().cos();
    let lng_deg = if ratio.is_finite() && ratio < 1.0 {
        ratio.asin().to_degrees()
    } else {
        180.0
    };

    (
        lat_deg * ENVELOPE_PAD + ENVELOPE_EPS,
        (lng_deg * ENVELOPE_PAD + ENVELOPE_EPS).min(180.0),
    )
}

/// Wrap a longitude into [-180, 180].
pub fn normalize_lng(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}

/// Offset a point by the given meters north and east.
///
/// Flat-earth approximation, good to centimeters over the distances the
/// tracker deals with. Longitude wraps across the antimeridian. Mostly useful
/// for building test tracks and fixtures.
pub fn offset_meters(origin: &GeoPoint, north_m: f64, east_m: f64) -> GeoPoint {
    let dlat = north_m / METERS_PER_DEGREE;
    let dlng = east_m / (METERS_PER_DEGREE * origin.lat.to_radians().cos());
    GeoPoint::new(origin.lat + dlat, normalize_lng(origin.lng + dlng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhaka() -> GeoPoint {
        GeoPoint::new(23.8103, 90.4125)
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_distance(&dhaka(), &dhaka()), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris, ~344 km
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let d = haversine_distance(&london, &paris);
        assert!((d - 343_560.0).abs() < 1000.0);
    }

    #[test]
    fn test_offset_meters_matches_haversine() {
        for &(n, e) in &[(5.0_f64, 0.0_f64), (0.0, 35.0), (100.0, 100.0), (-150.0, 20.0)] {
            let moved = offset_meters(&dhaka(), n, e);
            let expected = (n * n + e * e).sqrt();
            let d = haversine_distance(&dhaka(), &moved);
            assert!(
                (d - expected).abs() < 0.5,
                "offset ({}, {}) gave {}m",
                n,
                e,
                d
            );
        }
    }

    #[test]
    fn test_path_length() {
        assert_eq!(path_length(&[]), 0.0);
        assert_eq!(path_length(&[dhaka()]), 0.0);

        let path = vec![
            dhaka(),
            offset_meters(&dhaka(), 10.0, 0.0),
            offset_meters(&dhaka(), 20.0, 0.0),
        ];
        assert!((path_length(&path) - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_search_half_widths_contain_radius() {
        // Points exactly at the radius, in every direction, must fall inside the box
        for &lat in &[0.0, 23.8103, 60.0, 84.5, 89.0, 89.9] {
            let center = GeoPoint::new(lat, 10.0);
            let (dlat, dlng) = search_half_widths(100.0, lat);
            for bearing in 0..36 {
                let theta = (bearing as f64 * 10.0).to_radians();
                let edge = offset_meters(&center, 100.0 * theta.cos(), 100.0 * theta.sin());
                let d = haversine_distance(&center, &edge);
                if d > 100.0 {
                    continue;
                }
                assert!((edge.lat - center.lat).abs() <= dlat, "lat {} bearing {}", lat, bearing);
                assert!((edge.lng - center.lng).abs() <= dlng, "lat {} bearing {}", lat, bearing);
            }
        }
    }

    #[test]
    fn test_search_half_widths_polar_cap() {
        let (_, dlng) = search_half_widths(500.0, 89.999);
        assert_eq!(dlng, 180.0);
        let (_, dlng) = search_half_widths(500.0, -90.0);
        assert_eq!(dlng, 180.0);
    }

    #[test]
    fn test_offset_wraps_antimeridian() {
        let east = offset_meters(&GeoPoint::new(0.0, 179.99995), 0.0, 11.0);
        assert!(east.lng < 0.0 && east.lng > -180.0);
        assert!((haversine_distance(&GeoPoint::new(0.0, 179.99995), &east) - 11.0).abs() < 0.1);
    }
}
