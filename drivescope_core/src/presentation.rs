//! Display values handed to the rendering layer on every update.

use crate::braking::BrakingAlertState;
use crate::geo_units::{bearing_to_cardinal, mps_to_kmh, to_dms};
use crate::kinematics::{DisplayVectors, KinematicState};
use drivescope_env::ChannelState;
use serde::Serialize;

/// Qualitative band for the acceleration magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccelerationLevel {
    /// < 0.5 m/s²
    Steady,
    /// < 2.0 m/s²
    Gentle,
    /// < 5.0 m/s²
    Moderate,
    Harsh,
}

impl AccelerationLevel {
    pub fn from_magnitude(magnitude: f64) -> Self {
        match magnitude.abs() {
            m if m < 0.5 => AccelerationLevel::Steady,
            m if m < 2.0 => AccelerationLevel::Gentle,
            m if m < 5.0 => AccelerationLevel::Moderate,
            _ => AccelerationLevel::Harsh,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AccelerationLevel::Steady => "Steady",
            AccelerationLevel::Gentle => "Gentle",
            AccelerationLevel::Moderate => "Moderate",
            AccelerationLevel::Harsh => "Harsh",
        }
    }
}

/// Per-channel status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub position: &'static str,
    pub orientation: &'static str,
    pub motion: &'static str,
}

impl ChannelSummary {
    pub fn from_states(states: &[ChannelState; 3]) -> Self {
        Self {
            position: states[0].label(),
            orientation: states[1].label(),
            motion: states[2].label(),
        }
    }
}

/// Everything the dashboard shows for one update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub timestamp_ms: u64,
    pub speed_mps: f64,
    pub speed_kmh: f64,
    pub bearing_deg: f64,
    pub cardinal: &'static str,
    pub latitude_dms: String,
    pub longitude_dms: String,
    pub acceleration_magnitude: f64,
    pub acceleration_level: AccelerationLevel,
    pub forward_acceleration: f64,
    pub north_rotation_deg: f64,
    pub velocity_rotation_deg: f64,
    pub velocity_length: f64,
    pub braking_visible: bool,
    pub audio_unlocked: bool,
    pub channels: ChannelSummary,
}

impl DisplaySnapshot {
    pub fn build(
        timestamp_ms: u64,
        state: &KinematicState,
        vectors: &DisplayVectors,
        braking: &BrakingAlertState,
        channels: &[ChannelState; 3],
        audio_unlocked: bool,
    ) -> Self {
        Self {
            timestamp_ms,
            speed_mps: state.speed_mps,
            speed_kmh: mps_to_kmh(state.speed_mps),
            bearing_deg: state.bearing_deg,
            cardinal: bearing_to_cardinal(state.bearing_deg),
            latitude_dms: to_dms(state.latitude, true),
            longitude_dms: to_dms(state.longitude, false),
            acceleration_magnitude: state.acceleration_magnitude,
            acceleration_level: AccelerationLevel::from_magnitude(state.acceleration_magnitude),
            forward_acceleration: state.forward_acceleration,
            north_rotation_deg: vectors.north_rotation_deg,
            velocity_rotation_deg: vectors.velocity_rotation_deg,
            velocity_length: vectors.velocity_length,
            braking_visible: braking.is_braking,
            audio_unlocked,
            channels: ChannelSummary::from_states(channels),
        }
    }
}
