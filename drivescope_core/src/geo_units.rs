//! Unit & geo utilities.
//!
//! Pure functions for angle normalization, coordinate formatting and
//! spherical-earth displacement. All angles are in degrees, 0 = north,
//! increasing clockwise.

/// Mean earth radius for the spherical approximation (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Multiply m/s by this to get km/h
pub const MPS_TO_KMH: f64 = 3.6;

const CARDINALS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Milli-arcseconds per degree
const MAS_PER_DEG: u64 = 3_600_000;
const MAS_PER_MIN: u64 = 60_000;

/// Normalizes an angle to [0, 360).
///
/// Non-finite input is returned unchanged so callers can reject it.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Formats decimal degrees as degrees-minutes-seconds with a hemisphere
/// letter, e.g. `41° 30' 0.000" W`.
///
/// Seconds are rounded to the millisecond of arc before splitting, so a
/// value whose seconds would print as `60.000` carries into the minutes
/// (and minutes into degrees) instead.
pub fn to_dms(decimal_degrees: f64, is_latitude: bool) -> String {
    if !decimal_degrees.is_finite() {
        return "--".to_string();
    }
    let hemisphere = match (is_latitude, decimal_degrees < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    };

    let total_mas = (decimal_degrees.abs() * MAS_PER_DEG as f64).round() as u64;
    let degrees = total_mas / MAS_PER_DEG;
    let minutes = (total_mas % MAS_PER_DEG) / MAS_PER_MIN;
    let seconds_mas = total_mas % MAS_PER_MIN;

    format!(
        "{}° {}' {}.{:03}\" {}",
        degrees,
        minutes,
        seconds_mas / 1000,
        seconds_mas % 1000,
        hemisphere
    )
}

/// Maps a bearing to one of eight 45° compass sectors.
///
/// Each sector starts at its label: N covers [0, 45), NE [45, 90), and
/// so on. 360° wraps back to N.
pub fn bearing_to_cardinal(bearing_deg: f64) -> &'static str {
    if !bearing_deg.is_finite() {
        return CARDINALS[0];
    }
    let sector = (normalize_degrees(bearing_deg) / 45.0).floor() as usize;
    CARDINALS[sector % CARDINALS.len()]
}

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn mps_to_kmh(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_KMH
}

/// Great-circle forward displacement.
///
/// Returns the (latitude, longitude) reached after travelling
/// `distance_m` from the start point along `bearing_deg`. Longitude is
/// wrapped to [-180, 180).
pub fn destination_point(
    latitude: f64,
    longitude: f64,
    bearing_deg: f64,
    distance_m: f64,
) -> (f64, f64) {
    let angular = distance_m / EARTH_RADIUS_M;
    let phi1 = latitude.to_radians();
    let lambda1 = longitude.to_radians();
    let theta = bearing_deg.to_radians();

    let sin_phi2 = phi1.sin() * angular.cos() + phi1.cos() * angular.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * angular.sin() * phi1.cos()).atan2(angular.cos() - phi1.sin() * sin_phi2);

    let lon = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (phi2.to_degrees(), lon)
}

/// Haversine distance between two points in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert_eq!(normalize_degrees(-1e-20), 0.0);
        assert!(normalize_degrees(f64::NAN).is_nan());
    }

    #[test]
    fn test_to_dms_reference_values() {
        assert_eq!(to_dms(0.0, true), "0° 0' 0.000\" N");
        assert_eq!(to_dms(-41.5, false), "41° 30' 0.000\" W");
        assert_eq!(to_dms(-33.8688, true), "33° 52' 7.680\" S");
        assert_eq!(to_dms(151.2093, false), "151° 12' 33.480\" E");
    }

    #[test]
    fn test_to_dms_carries_rounded_seconds() {
        // 10° 59' 59.9999" rounds to 11° 0' 0.000"
        let value = 10.0 + 59.0 / 60.0 + 59.9999 / 3600.0;
        assert_eq!(to_dms(value, true), "11° 0' 0.000\" N");
    }

    #[test]
    fn test_to_dms_non_finite() {
        assert_eq!(to_dms(f64::NAN, true), "--");
    }

    #[test]
    fn test_bearing_to_cardinal() {
        assert_eq!(bearing_to_cardinal(0.0), "N");
        assert_eq!(bearing_to_cardinal(44.0), "N");
        assert_eq!(bearing_to_cardinal(46.0), "NE");
        assert_eq!(bearing_to_cardinal(90.0), "E");
        assert_eq!(bearing_to_cardinal(200.0), "S");
        assert_eq!(bearing_to_cardinal(359.9), "NW");
        assert_eq!(bearing_to_cardinal(360.0), "N");
        assert_eq!(bearing_to_cardinal(-45.0), "NW");
    }

    #[test]
    fn test_destination_point_north_one_degree() {
        let one_degree_m = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let (lat, lon) = destination_point(0.0, 0.0, 0.0, one_degree_m);
        assert_relative_eq!(lat, 1.0, epsilon = 1e-9);
        assert_relative_eq!(lon, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_destination_point_matches_haversine() {
        let (lat, lon) = destination_point(37.7749, -122.4194, 63.0, 1_500.0);
        let back = haversine_distance(37.7749, -122.4194, lat, lon);
        assert_relative_eq!(back, 1_500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_destination_point_wraps_antimeridian() {
        let (_, lon) = destination_point(0.0, 179.9999, 90.0, 1_000.0);
        assert!(lon < -179.0);
    }

    #[test]
    fn test_lerp_and_units() {
        assert_eq!(lerp(35.0, 70.0, 0.0), 35.0);
        assert_eq!(lerp(35.0, 70.0, 1.0), 70.0);
        assert_eq!(lerp(35.0, 70.0, 0.5), 52.5);
        assert_relative_eq!(mps_to_kmh(10.0), 36.0);
    }

    proptest! {
        #[test]
        fn prop_normalize_in_range_and_congruent(theta in -1.0e6f64..1.0e6f64) {
            let n = normalize_degrees(theta);
            prop_assert!((0.0..360.0).contains(&n));
            let k = ((theta - n) / 360.0).round();
            prop_assert!((theta - n - k * 360.0).abs() < 1e-6);
        }

        #[test]
        fn prop_cardinal_matches_sector(bearing in 0.0f64..360.0) {
            let label = bearing_to_cardinal(bearing);
            let idx = CARDINALS.iter().position(|c| *c == label).unwrap();
            prop_assert!(bearing >= idx as f64 * 45.0 && bearing < (idx + 1) as f64 * 45.0);
        }

        #[test]
        fn prop_dms_hemisphere(value in -90.0f64..90.0) {
            let text = to_dms(value, true);
            let expected = if value < 0.0 { 'S' } else { 'N' };
            prop_assert!(text.ends_with(expected));
        }
    }
}
