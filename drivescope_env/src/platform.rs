//! Platform sensor provider abstraction.
//!
//! Raw event shapes here mirror what device platforms actually hand out:
//! nullable speed/heading on position fixes, two different orientation
//! conventions, and acceleration with or without gravity. Only the live
//! sensor source looks at these; everything downstream sees the normalized
//! samples in `types`.

use crate::error::SensorError;
use crate::types::SensorChannel;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Platform does not gate this sensor behind a prompt
    NotRequired,
}

impl PermissionState {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, PermissionState::Denied)
    }
}

/// Options for a continuous position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Request the most accurate fix source available
    pub high_accuracy: bool,

    /// Maximum age of a cached fix the provider may return (0 = never cached)
    pub maximum_age_ms: u64,

    /// Time the provider may take to produce a fix
    pub timeout_ms: u64,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age_ms: 0,
            timeout_ms: 10_000,
        }
    }
}

/// A position fix as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Frequently null at low velocity
    pub speed: Option<f64>,
    /// Frequently null or NaN when stationary
    pub heading: Option<f64>,
    pub accuracy: f64,
    pub timestamp_ms: i64,
}

/// Failure reported by the position provider instead of a fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionFault {
    PermissionDenied,
    Unavailable(String),
    Timeout,
}

/// One item on a position watch.
pub type PositionEvent = Result<RawPosition, PositionFault>;

/// Reference frame of an orientation subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationFrame {
    /// Referenced to magnetic north
    Absolute,
    /// Referenced to the device's attitude at subscription time
    Relative,
}

/// An orientation event as delivered by the platform.
///
/// W3C-style events report `alpha` counter-clockwise from north;
/// iOS-style events additionally carry a clockwise `compass_heading`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawOrientation {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub compass_heading: Option<f64>,
}

/// A motion event as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawMotion {
    /// Linear acceleration with gravity removed, if supported
    pub acceleration: Option<[Option<f64>; 3]>,
    /// Raw accelerometer output including gravity
    pub acceleration_including_gravity: Option<[Option<f64>; 3]>,
    /// Sampling interval in milliseconds
    pub interval_ms: f64,
}

/// The platform's sensor facilities.
///
/// Each `watch_*` call starts a subscription and hands back its receiver;
/// dropping the receiver ends the subscription.
///
/// # Implementations
///
/// - **Device**: a binding to the host's geolocation/orientation/motion APIs
/// - **Simulation**: `SimPlatform` - scripted raw events
#[async_trait]
pub trait PlatformSensors: Send + Sync + 'static {
    /// Prompts the user for access to a channel.
    ///
    /// Must be reached from a user-initiated interaction on platforms that
    /// require it. Suspends until the prompt resolves.
    async fn request_permission(&self, channel: SensorChannel) -> PermissionState;

    /// Starts a continuous position watch.
    fn watch_position(
        &self,
        options: &PositionOptions,
    ) -> Result<mpsc::UnboundedReceiver<PositionEvent>, SensorError>;

    /// Starts an orientation subscription in the requested frame.
    ///
    /// # Returns
    /// * `Err(SensorError::SensorUnavailable)` - The frame is not supported
    fn watch_orientation(
        &self,
        frame: OrientationFrame,
    ) -> Result<mpsc::UnboundedReceiver<RawOrientation>, SensorError>;

    /// Starts a motion subscription.
    fn watch_motion(&self) -> Result<mpsc::UnboundedReceiver<RawMotion>, SensorError>;
}
