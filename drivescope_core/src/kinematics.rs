//! Kinematic State Aggregator
//!
//! Folds the three independent sample streams into one consistent state
//! and derives the two pointer vectors the dashboard draws. Streams may
//! interleave arbitrarily; each handler only touches the fields its own
//! stream owns.

use crate::geo_units::{lerp, normalize_degrees};
use drivescope_env::{MotionSample, OrientationSample, PositionSample, SensorError};
use serde::Serialize;

/// Shortest velocity pointer (display units, speed 0)
pub const POINTER_MIN_LENGTH: f64 = 35.0;

/// Longest velocity pointer (display units)
pub const POINTER_MAX_LENGTH: f64 = 70.0;

/// Speed at which the velocity pointer reaches full length (m/s)
pub const POINTER_FULL_SCALE_MPS: f64 = 30.0;

/// Last update time per stream, in context milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamTimestamps {
    pub position: Option<u64>,
    pub orientation: Option<u64>,
    pub motion: Option<u64>,
}

/// Latest normalized kinematics.
///
/// Starts zeroed; every field is only written by the handler for the
/// stream it comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KinematicState {
    /// Ground speed in m/s
    pub speed_mps: f64,
    /// Direction of travel in [0, 360)
    pub bearing_deg: f64,
    /// Device facing in [0, 360)
    pub azimuth_deg: f64,
    /// Signed acceleration along the travel axis in m/s²
    pub forward_acceleration: f64,
    /// Total gravity-excluded acceleration in m/s²
    pub acceleration_magnitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub last_update: StreamTimestamps,
}

impl KinematicState {
    /// True once at least one position fix has been applied.
    pub fn has_fix(&self) -> bool {
        self.last_update.position.is_some()
    }
}

/// Rotation/length of the two dashboard pointers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayVectors {
    /// Counter-rotation keeping the north pointer on north
    pub north_rotation_deg: f64,
    /// Travel direction relative to device facing, in [0, 360)
    pub velocity_rotation_deg: f64,
    /// Grows with speed, clamped at `POINTER_FULL_SCALE_MPS`
    pub velocity_length: f64,
}

impl DisplayVectors {
    /// Pure derivation from a state.
    pub fn from_state(state: &KinematicState) -> Self {
        Self {
            north_rotation_deg: -state.azimuth_deg,
            velocity_rotation_deg: normalize_degrees(state.bearing_deg - state.azimuth_deg),
            velocity_length: velocity_pointer_length(state.speed_mps),
        }
    }
}

/// Velocity pointer length for a speed.
pub fn velocity_pointer_length(speed_mps: f64) -> f64 {
    let t = (speed_mps.max(0.0) / POINTER_FULL_SCALE_MPS).min(1.0);
    lerp(POINTER_MIN_LENGTH, POINTER_MAX_LENGTH, t)
}

/// Owns the `KinematicState` and is its only writer.
#[derive(Debug, Default)]
pub struct KinematicAggregator {
    state: KinematicState,
    rejected: u64,
}

impl KinematicAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a position fix.
    ///
    /// Speed falls back to 0 and bearing to the previous value when the
    /// fix omits them. Fixes with non-finite coordinates are rejected.
    pub fn on_position(&mut self, sample: &PositionSample, now_ms: u64) -> Result<(), SensorError> {
        if !sample.latitude.is_finite() || !sample.longitude.is_finite() {
            return Err(self.reject("non-finite coordinates"));
        }

        self.state.speed_mps = sample
            .speed_mps
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(0.0);
        if let Some(bearing) = sample.bearing_deg.filter(|b| b.is_finite()) {
            self.state.bearing_deg = normalize_degrees(bearing);
        }
        self.state.latitude = sample.latitude;
        self.state.longitude = sample.longitude;
        self.state.accuracy_m = sample.accuracy_m;
        self.state.last_update.position = Some(now_ms);
        Ok(())
    }

    /// Applies a compass reading. Non-finite azimuths leave state untouched.
    pub fn on_orientation(
        &mut self,
        sample: &OrientationSample,
        now_ms: u64,
    ) -> Result<(), SensorError> {
        if !sample.azimuth_deg.is_finite() {
            return Err(self.reject("non-finite azimuth"));
        }
        self.state.azimuth_deg = normalize_degrees(sample.azimuth_deg);
        self.state.last_update.orientation = Some(now_ms);
        Ok(())
    }

    /// Applies a motion reading and returns the forward acceleration to
    /// hand to the braking detector.
    pub fn on_motion(&mut self, sample: &MotionSample, now_ms: u64) -> Result<f64, SensorError> {
        if !sample.forward_acceleration.is_finite() || !sample.magnitude.is_finite() {
            return Err(self.reject("non-finite acceleration"));
        }
        self.state.forward_acceleration = sample.forward_acceleration;
        self.state.acceleration_magnitude = sample.magnitude.abs();
        self.state.last_update.motion = Some(now_ms);
        Ok(sample.forward_acceleration)
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn vectors(&self) -> DisplayVectors {
        DisplayVectors::from_state(&self.state)
    }

    /// Number of samples dropped as malformed.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    fn reject(&mut self, reason: &str) -> SensorError {
        self.rejected += 1;
        tracing::debug!(reason, "dropping malformed sample");
        SensorError::invalid(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fix(speed: Option<f64>, bearing: Option<f64>) -> PositionSample {
        PositionSample {
            latitude: 51.5,
            longitude: -0.12,
            speed_mps: speed,
            bearing_deg: bearing,
            accuracy_m: 4.0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_initial_state_is_zeroed() {
        let agg = KinematicAggregator::new();
        assert_eq!(agg.state().speed_mps, 0.0);
        assert!(!agg.state().has_fix());
        assert_eq!(agg.vectors().velocity_length, POINTER_MIN_LENGTH);
    }

    #[test]
    fn test_position_retains_bearing_when_omitted() {
        let mut agg = KinematicAggregator::new();
        agg.on_position(&fix(Some(10.0), Some(90.0)), 1).unwrap();
        agg.on_position(&fix(None, None), 2).unwrap();

        assert_eq!(agg.state().speed_mps, 0.0);
        assert_eq!(agg.state().bearing_deg, 90.0);
        assert_eq!(agg.state().last_update.position, Some(2));
    }

    #[test]
    fn test_position_normalizes_bearing() {
        let mut agg = KinematicAggregator::new();
        agg.on_position(&fix(Some(3.0), Some(-90.0)), 0).unwrap();
        assert_eq!(agg.state().bearing_deg, 270.0);
    }

    #[test]
    fn test_non_finite_azimuth_is_dropped() {
        let mut agg = KinematicAggregator::new();
        agg.on_orientation(&OrientationSample::flat(45.0), 1).unwrap();

        let err = agg.on_orientation(&OrientationSample::flat(f64::NAN), 2).unwrap_err();
        assert!(matches!(err, SensorError::InvalidSample(_)));
        assert_eq!(agg.state().azimuth_deg, 45.0);
        assert_eq!(agg.state().last_update.orientation, Some(1));
        assert_eq!(agg.rejected_count(), 1);
    }

    #[test]
    fn test_non_finite_position_is_dropped() {
        let mut agg = KinematicAggregator::new();
        let mut bad = fix(Some(5.0), Some(10.0));
        bad.latitude = f64::INFINITY;
        assert!(agg.on_position(&bad, 1).is_err());
        assert!(!agg.state().has_fix());
    }

    #[test]
    fn test_motion_returns_forward_acceleration() {
        let mut agg = KinematicAggregator::new();
        let forward = agg.on_motion(&MotionSample::forward_only(-3.0), 5).unwrap();
        assert_eq!(forward, -3.0);
        assert_eq!(agg.state().acceleration_magnitude, 3.0);
    }

    #[test]
    fn test_vectors_aligned_travel() {
        let mut agg = KinematicAggregator::new();
        agg.on_position(&fix(Some(10.0), Some(90.0)), 0).unwrap();
        agg.on_orientation(&OrientationSample::flat(90.0), 1).unwrap();

        let v = agg.vectors();
        assert_eq!(v.velocity_rotation_deg, 0.0);
        assert_eq!(v.north_rotation_deg, -90.0);
    }

    #[test]
    fn test_vectors_order_independent() {
        let mut a = KinematicAggregator::new();
        a.on_orientation(&OrientationSample::flat(300.0), 0).unwrap();
        a.on_position(&fix(Some(7.0), Some(30.0)), 1).unwrap();

        let mut b = KinematicAggregator::new();
        b.on_position(&fix(Some(7.0), Some(30.0)), 0).unwrap();
        b.on_orientation(&OrientationSample::flat(300.0), 1).unwrap();

        assert_eq!(a.vectors(), b.vectors());
        assert_eq!(a.vectors().velocity_rotation_deg, 90.0);
    }

    #[test]
    fn test_velocity_pointer_length_clamped() {
        assert_eq!(velocity_pointer_length(0.0), 35.0);
        assert_eq!(velocity_pointer_length(30.0), 70.0);
        assert_eq!(velocity_pointer_length(60.0), 70.0);
        assert_relative_eq!(velocity_pointer_length(15.0), 52.5);

        let mut last = 0.0;
        for step in 0..=80 {
            let len = velocity_pointer_length(step as f64 * 0.5);
            assert!(len >= last);
            last = len;
        }
    }
}
