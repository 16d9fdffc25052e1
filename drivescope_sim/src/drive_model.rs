//! Drive Model - ground truth for the synthetic sensor source.
//!
//! A four-phase scenario machine stepped at a fixed tick rate. Each step
//! advances the vehicle along a great circle and produces one sample per
//! channel. Motion samples carry bounded jitter on the raw axes; the forward
//! acceleration field is left clean.

use drivescope_core::geo_units::{destination_point, normalize_degrees};
use drivescope_env::{MotionSample, OrientationSample, PositionSample};
use nalgebra::Vector3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::f64::consts::PI;

/// Top speed reached while accelerating (m/s).
pub const MAX_SPEED_MPS: f64 = 15.0;
/// Speed gained per tick while accelerating.
pub const ACCELERATE_STEP_MPS: f64 = 0.5;
/// Speed lost per tick while braking.
pub const BRAKE_STEP_MPS: f64 = 2.5;
pub const ACCELERATE_FORWARD: f64 = 2.5;
pub const BRAKE_FORWARD: f64 = -7.0;
/// Amplitude of the cruise forward-acceleration wobble (m/s²).
pub const CRUISE_OSCILLATION: f64 = 0.5;
/// Chance that a cruise ends in braking rather than accelerating.
pub const BRAKE_PROBABILITY: f64 = 0.7;

const ACCELERATE_SECS: f64 = 5.0;
const BRAKE_SECS: f64 = 2.0;
const STOP_SECS: f64 = 3.0;
const CRUISE_DWELL_SECS: (f64, f64) = (8.0, 12.0);

/// Max bearing drift during cruise (degrees).
const BEARING_DRIFT_DEG: f64 = 15.0;
/// Max difference between device facing and travel direction (degrees).
const FACING_DRIFT_DEG: f64 = 5.0;

/// Configuration for a simulated drive.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Tick rate in Hz (default: 30)
    pub tick_rate_hz: u32,

    /// Simulated duration in seconds (default: 60)
    pub duration_secs: f64,

    /// Starting point (degrees)
    pub origin_latitude: f64,
    pub origin_longitude: f64,

    /// Base direction of travel (degrees)
    pub initial_bearing_deg: f64,

    /// Bound of the uniform jitter added to each motion axis (m/s²)
    pub motion_noise: f64,

    /// Horizontal accuracy reported with each fix (meters)
    pub position_accuracy_m: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate_hz: 30,
            duration_secs: 60.0,
            origin_latitude: 37.7749,
            origin_longitude: -122.4194,
            initial_bearing_deg: 45.0,
            motion_noise: 0.05,
            position_accuracy_m: 5.0,
        }
    }
}

/// Longest drive a run accepts (one day).
pub const MAX_DURATION_SECS: f64 = 86_400.0;

impl SimConfig {
    /// Checks the run length and tick rate before any tick is computed.
    pub fn validate(&self) -> Result<(), String> {
        if !self.duration_secs.is_finite()
            || self.duration_secs < 0.0
            || self.duration_secs > MAX_DURATION_SECS
        {
            return Err(format!(
                "duration must be between 0 and {} seconds, got {}",
                MAX_DURATION_SECS, self.duration_secs
            ));
        }
        if self.tick_rate_hz == 0 {
            return Err("tick rate must be at least 1 Hz".to_string());
        }
        Ok(())
    }

    /// Seconds per tick.
    pub fn tick_secs(&self) -> f64 {
        1.0 / self.tick_rate_hz.max(1) as f64
    }

    /// Number of ticks covering `duration_secs`.
    pub fn total_ticks(&self) -> u64 {
        (self.duration_secs.max(0.0) * self.tick_rate_hz as f64).round() as u64
    }
}

/// Scenario phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrivePhase {
    Accelerate,
    Cruise,
    Brake,
    Stop,
}

impl DrivePhase {
    pub fn name(&self) -> &'static str {
        match self {
            DrivePhase::Accelerate => "accelerate",
            DrivePhase::Cruise => "cruise",
            DrivePhase::Brake => "brake",
            DrivePhase::Stop => "stop",
        }
    }
}

impl std::fmt::Display for DrivePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One tick's worth of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFrame {
    /// Phase the samples were produced in
    pub phase: DrivePhase,
    pub position: PositionSample,
    pub orientation: OrientationSample,
    pub motion: MotionSample,
}

/// The scenario state machine.
pub struct DriveModel {
    rng: ChaCha8Rng,
    tick_secs: f64,
    motion_noise: f64,
    accuracy_m: f64,
    base_bearing: f64,

    phase: DrivePhase,
    phase_ticks: u64,
    cruise_dwell_ticks: u64,
    ticks: u64,

    speed: f64,
    forward: f64,
    bearing: f64,
    azimuth: f64,
    latitude: f64,
    longitude: f64,
    /// Time spent cruising; drives the heading wobble
    cruise_time: f64,
}

impl DriveModel {
    /// Creates a model at rest in `Accelerate`.
    pub fn new(config: &SimConfig, rng: ChaCha8Rng) -> Self {
        let bearing = normalize_degrees(config.initial_bearing_deg);
        Self {
            rng,
            tick_secs: config.tick_secs(),
            motion_noise: config.motion_noise.abs(),
            accuracy_m: config.position_accuracy_m,
            base_bearing: bearing,
            phase: DrivePhase::Accelerate,
            phase_ticks: 0,
            cruise_dwell_ticks: 0,
            ticks: 0,
            speed: 0.0,
            forward: 0.0,
            bearing,
            azimuth: bearing,
            latitude: config.origin_latitude,
            longitude: config.origin_longitude,
            cruise_time: 0.0,
        }
    }

    /// Jumps to `phase` with the given speed, restarting its timer.
    pub fn force_phase(&mut self, phase: DrivePhase, speed_mps: f64) {
        self.speed = speed_mps.clamp(0.0, MAX_SPEED_MPS);
        self.enter(phase);
    }

    /// Advances one tick and returns the samples for it.
    pub fn step(&mut self, timestamp_ms: i64) -> DriveFrame {
        let phase = self.phase;
        let elapsed = self.ticks as f64 * self.tick_secs;

        match phase {
            DrivePhase::Accelerate => {
                self.speed = (self.speed + ACCELERATE_STEP_MPS).min(MAX_SPEED_MPS);
                self.forward = ACCELERATE_FORWARD;
            }
            DrivePhase::Cruise => {
                self.cruise_time += self.tick_secs;
                self.forward = CRUISE_OSCILLATION * (2.0 * PI * elapsed / 6.0).sin();
                let drift = BEARING_DRIFT_DEG * (2.0 * PI * self.cruise_time / 40.0).sin();
                self.bearing = normalize_degrees(self.base_bearing + drift);
                let facing = FACING_DRIFT_DEG * (2.0 * PI * self.cruise_time / 25.0).sin();
                self.azimuth = normalize_degrees(self.bearing + facing);
            }
            DrivePhase::Brake => {
                self.speed = (self.speed - BRAKE_STEP_MPS).max(0.0);
                self.forward = BRAKE_FORWARD;
            }
            DrivePhase::Stop => {
                self.speed = 0.0;
                self.forward = 0.0;
            }
        }

        let (lat, lon) = destination_point(
            self.latitude,
            self.longitude,
            self.bearing,
            self.speed * self.tick_secs,
        );
        self.latitude = lat;
        self.longitude = lon;

        let frame = DriveFrame {
            phase,
            position: PositionSample {
                latitude: self.latitude,
                longitude: self.longitude,
                speed_mps: Some(self.speed),
                bearing_deg: Some(self.bearing),
                accuracy_m: self.accuracy_m,
                timestamp_ms,
            },
            orientation: OrientationSample::flat(self.azimuth),
            motion: self.motion_sample(),
        };

        self.ticks += 1;
        self.phase_ticks += 1;
        self.advance_phase();
        frame
    }

    fn motion_sample(&mut self) -> MotionSample {
        let jitter = Vector3::new(self.noise(), self.noise(), self.noise());
        let axes = Vector3::new(0.0, self.forward, 0.0) + jitter;
        MotionSample::from_axes(axes, self.forward)
    }

    fn noise(&mut self) -> f64 {
        if self.motion_noise == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.motion_noise..=self.motion_noise)
    }

    fn ticks_for(&self, secs: f64) -> u64 {
        (secs / self.tick_secs).round() as u64
    }

    fn advance_phase(&mut self) {
        let next = match self.phase {
            DrivePhase::Accelerate if self.phase_ticks >= self.ticks_for(ACCELERATE_SECS) => {
                Some(DrivePhase::Cruise)
            }
            DrivePhase::Cruise if self.phase_ticks >= self.cruise_dwell_ticks => {
                if self.rng.gen_bool(BRAKE_PROBABILITY) {
                    Some(DrivePhase::Brake)
                } else {
                    Some(DrivePhase::Accelerate)
                }
            }
            DrivePhase::Brake if self.speed <= 0.0 => Some(DrivePhase::Stop),
            DrivePhase::Brake if self.phase_ticks >= self.ticks_for(BRAKE_SECS) => {
                Some(DrivePhase::Cruise)
            }
            DrivePhase::Stop if self.phase_ticks >= self.ticks_for(STOP_SECS) => {
                Some(DrivePhase::Accelerate)
            }
            _ => None,
        };
        if let Some(phase) = next {
            self.enter(phase);
        }
    }

    fn enter(&mut self, phase: DrivePhase) {
        tracing::debug!(from = %self.phase, to = %phase, speed_mps = self.speed, "drive phase");
        self.phase = phase;
        self.phase_ticks = 0;
        if phase == DrivePhase::Cruise {
            let (lo, hi) = CRUISE_DWELL_SECS;
            let dwell = self.rng.gen_range(lo..=hi);
            self.cruise_dwell_ticks = self.ticks_for(dwell);
        }
    }

    pub fn phase(&self) -> DrivePhase {
        self.phase
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn forward_acceleration(&self) -> f64 {
        self.forward
    }

    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Ticks stepped so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Ticks the current cruise will last.
    pub fn cruise_dwell_ticks(&self) -> u64 {
        self.cruise_dwell_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use drivescope_core::geo_units::haversine_distance;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn model(seed: u64) -> DriveModel {
        DriveModel::new(&SimConfig::default(), ChaCha8Rng::seed_from_u64(seed))
    }

    fn run(model: &mut DriveModel, ticks: u64) -> Vec<DriveFrame> {
        (0..ticks).map(|_| model.step(0)).collect()
    }

    #[test]
    fn test_accelerate_reaches_cruise_after_five_seconds() {
        let mut m = model(1);
        run(&mut m, 149);
        assert_eq!(m.phase(), DrivePhase::Accelerate);

        m.step(0);
        assert_eq!(m.phase(), DrivePhase::Cruise);
        assert_eq!(m.speed(), 15.0);
    }

    #[test]
    fn test_accelerate_caps_speed() {
        let mut m = model(1);
        let frames = run(&mut m, 40);
        assert_eq!(frames[0].position.speed_mps, Some(0.5));
        assert_eq!(frames[29].position.speed_mps, Some(15.0));
        assert!(frames.iter().all(|f| f.motion.forward_acceleration == ACCELERATE_FORWARD));
    }

    #[test]
    fn test_cruise_dwell_within_bounds() {
        for seed in 0..20 {
            let mut m = model(seed);
            run(&mut m, 150);
            let dwell = m.cruise_dwell_ticks();
            assert!((240..=360).contains(&dwell), "dwell {} out of range", dwell);
        }
    }

    #[test]
    fn test_cruise_forward_acceleration_bounded() {
        let mut m = model(3);
        m.force_phase(DrivePhase::Cruise, 15.0);
        for frame in run(&mut m, 200).iter().filter(|f| f.phase == DrivePhase::Cruise) {
            assert!(frame.motion.forward_acceleration.abs() <= CRUISE_OSCILLATION + 1e-12);
            assert_eq!(frame.position.speed_mps, Some(15.0));
        }
    }

    #[test]
    fn test_brake_to_stop_to_accelerate() {
        let mut m = model(5);
        m.force_phase(DrivePhase::Brake, 15.0);

        let frames = run(&mut m, 6);
        assert!(frames.iter().all(|f| f.motion.forward_acceleration == BRAKE_FORWARD));
        assert_eq!(m.speed(), 0.0);
        assert_eq!(m.phase(), DrivePhase::Stop);

        run(&mut m, 89);
        assert_eq!(m.phase(), DrivePhase::Stop);
        m.step(0);
        assert_eq!(m.phase(), DrivePhase::Accelerate);
    }

    #[test]
    fn test_brake_times_out_to_cruise() {
        // A slow tick rate keeps speed above zero for the whole 2s window
        let config = SimConfig {
            tick_rate_hz: 2,
            ..Default::default()
        };
        let mut m = DriveModel::new(&config, ChaCha8Rng::seed_from_u64(9));
        m.force_phase(DrivePhase::Brake, 15.0);
        m.step(0);
        m.step(0);
        m.step(0);
        m.step(0);
        assert_eq!(m.speed(), 5.0);
        assert_eq!(m.phase(), DrivePhase::Cruise);
    }

    #[test]
    fn test_position_advances_by_speed() {
        let mut m = model(2);
        m.force_phase(DrivePhase::Cruise, 15.0);
        let start = m.position();
        run(&mut m, 30);
        let end = m.position();

        let moved = haversine_distance(start.0, start.1, end.0, end.1);
        assert_relative_eq!(moved, 15.0, epsilon = 0.05);
    }

    #[test]
    fn test_noise_does_not_touch_forward_signal() {
        let mut m = model(11);
        let frame = m.step(0);
        assert_eq!(frame.motion.forward_acceleration, ACCELERATE_FORWARD);
        let jitter = frame.motion.acceleration - Vector3::new(0.0, ACCELERATE_FORWARD, 0.0);
        assert!(jitter.iter().all(|c| c.abs() <= 0.05 + 1e-12));
    }

    #[test]
    fn test_same_seed_same_drive() {
        let mut a = model(77);
        let mut b = model(77);
        assert_eq!(run(&mut a, 900), run(&mut b, 900));
    }

    proptest! {
        #[test]
        fn prop_drive_stays_physical(seed in any::<u64>(), ticks in 1u64..2_000) {
            let mut m = model(seed);
            for _ in 0..ticks {
                let frame = m.step(0);
                let speed = frame.position.speed_mps.unwrap_or(-1.0);
                prop_assert!((0.0..=MAX_SPEED_MPS).contains(&speed));
                let bearing = frame.position.bearing_deg.unwrap_or(-1.0);
                prop_assert!((0.0..360.0).contains(&bearing));
                prop_assert!((0.0..360.0).contains(&frame.orientation.azimuth_deg));
            }
        }
    }
}
