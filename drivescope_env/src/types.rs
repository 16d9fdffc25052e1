//! Normalized sample types shared by every sensor source.
//!
//! These are the only shapes the pipeline ever sees. Platform-specific
//! event layouts are converted into them inside the source variants.

use crate::error::SensorError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a dashboard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random SessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic SessionId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// The three independent sample streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    Position,
    Orientation,
    Motion,
}

impl SensorChannel {
    pub fn all() -> [SensorChannel; 3] {
        [SensorChannel::Position, SensorChannel::Orientation, SensorChannel::Motion]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorChannel::Position => "position",
            SensorChannel::Orientation => "orientation",
            SensorChannel::Motion => "motion",
        }
    }
}

impl std::fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// Ground speed in m/s (>= 0) if the provider reported one
    pub speed_mps: Option<f64>,

    /// Direction of travel in [0, 360) if the provider reported one
    pub bearing_deg: Option<f64>,

    /// Horizontal accuracy radius in meters
    pub accuracy_m: f64,

    /// Fix time in milliseconds
    pub timestamp_ms: i64,
}

/// A compass/tilt reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Compass heading of the device, 0 = magnetic north, clockwise
    pub azimuth_deg: f64,

    /// Front-to-back tilt in degrees
    pub tilt_front_back: f64,

    /// Left-to-right tilt in degrees
    pub tilt_left_right: f64,
}

impl OrientationSample {
    /// Creates a flat (untilted) sample with the given azimuth.
    pub fn flat(azimuth_deg: f64) -> Self {
        Self {
            azimuth_deg,
            tilt_front_back: 0.0,
            tilt_left_right: 0.0,
        }
    }
}

/// A gravity-excluded acceleration reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Device-frame acceleration [x, y, z] in m/s²
    pub acceleration: Vector3<f64>,

    /// Euclidean norm of `acceleration`
    pub magnitude: f64,

    /// Signed acceleration along the travel axis (negative = deceleration)
    pub forward_acceleration: f64,
}

impl MotionSample {
    /// Builds a sample from device axes, computing the magnitude.
    pub fn from_axes(acceleration: Vector3<f64>, forward_acceleration: f64) -> Self {
        Self {
            acceleration,
            magnitude: acceleration.norm(),
            forward_acceleration,
        }
    }

    /// A sample with all acceleration along the travel axis.
    pub fn forward_only(forward_acceleration: f64) -> Self {
        Self::from_axes(Vector3::new(0.0, forward_acceleration, 0.0), forward_acceleration)
    }
}

/// Health of a single sensor channel as reported by its source.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    /// Not yet initialized
    Pending,

    /// Delivering samples normally
    Active,

    /// Delivering samples with reduced accuracy (e.g. relative orientation)
    Degraded(String),

    /// No samples will arrive
    Unavailable(SensorError),
}

impl ChannelState {
    pub fn is_delivering(&self) -> bool {
        matches!(self, ChannelState::Active | ChannelState::Degraded(_))
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ChannelState::Pending => "pending",
            ChannelState::Active => "active",
            ChannelState::Degraded(_) => "degraded",
            ChannelState::Unavailable(SensorError::PermissionDenied(_)) => "denied",
            ChannelState::Unavailable(_) => "unavailable",
        }
    }
}

/// A status change for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub channel: SensorChannel,
    pub state: ChannelState,
}

impl ChannelStatus {
    pub fn new(channel: SensorChannel, state: ChannelState) -> Self {
        Self { channel, state }
    }
}

/// Everything a sensor source can push to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Position(PositionSample),
    Orientation(OrientationSample),
    Motion(MotionSample),
    Status(ChannelStatus),
}

impl SensorEvent {
    /// Returns the channel this event belongs to.
    pub fn channel(&self) -> SensorChannel {
        match self {
            SensorEvent::Position(_) => SensorChannel::Position,
            SensorEvent::Orientation(_) => SensorChannel::Orientation,
            SensorEvent::Motion(_) => SensorChannel::Motion,
            SensorEvent::Status(status) => status.channel,
        }
    }
}

/// Which channels a source managed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub position_available: bool,
    pub orientation_available: bool,
    pub motion_available: bool,
}

impl Capabilities {
    /// All three channels available.
    pub fn all() -> Self {
        Self {
            position_available: true,
            orientation_available: true,
            motion_available: true,
        }
    }

    pub fn has(&self, channel: SensorChannel) -> bool {
        match channel {
            SensorChannel::Position => self.position_available,
            SensorChannel::Orientation => self.orientation_available,
            SensorChannel::Motion => self.motion_available,
        }
    }

    pub fn set(&mut self, channel: SensorChannel, available: bool) {
        match channel {
            SensorChannel::Position => self.position_available = available,
            SensorChannel::Orientation => self.orientation_available = available,
            SensorChannel::Motion => self.motion_available = available,
        }
    }
}
