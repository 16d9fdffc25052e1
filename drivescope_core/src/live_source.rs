//! Live Sensor Source
//!
//! Wraps a platform's position, orientation and motion subscriptions and
//! converts their raw event shapes into normalized samples. Everything
//! platform-specific (nullable fields, alpha vs. compass heading, gravity
//! handling) stops here.

use crate::geo_units::normalize_degrees;
use async_trait::async_trait;
use drivescope_env::{
    Capabilities, ChannelState, MotionSample, OrientationFrame, OrientationSample, PlatformSensors,
    PositionFault, PositionOptions, PositionSample, RawMotion, RawOrientation, RawPosition,
    SampleSink, SensorChannel, SensorError, SensorEvent, SensorSource, Subscriptions,
};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Which device axis points along the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountAxis {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl MountAxis {
    /// Component of `v` along this axis.
    pub fn component(&self, v: &Vector3<f64>) -> f64 {
        match self {
            MountAxis::PosX => v.x,
            MountAxis::NegX => -v.x,
            MountAxis::PosY => v.y,
            MountAxis::NegY => -v.y,
            MountAxis::PosZ => v.z,
            MountAxis::NegZ => -v.z,
        }
    }
}

/// Configuration for the live source.
#[derive(Debug, Clone)]
pub struct LiveSourceConfig {
    /// Position watch options (default: high accuracy, no cache, 10s timeout)
    pub position: PositionOptions,

    /// Time to wait for a first orientation/motion event (default: 2000)
    pub liveness_window_ms: u64,

    /// Device axis aligned with travel (default: +Y)
    pub mount_axis: MountAxis,

    /// Low-pass factor for the software gravity estimate (default: 0.8)
    pub gravity_filter_alpha: f64,
}

impl Default for LiveSourceConfig {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            liveness_window_ms: 2_000,
            mount_axis: MountAxis::PosY,
            gravity_filter_alpha: 0.8,
        }
    }
}

/// Fills the gaps platforms leave in position fixes.
#[derive(Debug, Default, Clone)]
pub struct PositionNormalizer {
    last_bearing: Option<f64>,
}

impl PositionNormalizer {
    /// Converts a raw fix, substituting 0 for a missing speed and the last
    /// known bearing for a missing heading. Returns `None` for fixes
    /// without usable coordinates.
    pub fn normalize(&mut self, raw: &RawPosition) -> Option<PositionSample> {
        if !raw.latitude.is_finite() || !raw.longitude.is_finite() {
            return None;
        }
        let speed = raw
            .speed
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(0.0);
        let bearing = match raw.heading.filter(|h| h.is_finite()) {
            Some(heading) => normalize_degrees(heading),
            None => self.last_bearing.unwrap_or(0.0),
        };
        self.last_bearing = Some(bearing);

        Some(PositionSample {
            latitude: raw.latitude,
            longitude: raw.longitude,
            speed_mps: Some(speed),
            bearing_deg: Some(bearing),
            accuracy_m: raw.accuracy,
            timestamp_ms: raw.timestamp_ms,
        })
    }
}

/// Converts a raw orientation event to a compass sample.
///
/// A clockwise compass heading is used as-is when present; otherwise the
/// counter-clockwise `alpha` is mirrored. Events with neither are dropped.
pub fn orientation_from_raw(raw: &RawOrientation) -> Option<OrientationSample> {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let heading = match finite(raw.compass_heading) {
        Some(heading) => heading,
        None => 360.0 - finite(raw.alpha)?,
    };
    Some(OrientationSample {
        azimuth_deg: normalize_degrees(heading),
        tilt_front_back: finite(raw.beta).unwrap_or(0.0),
        tilt_left_right: finite(raw.gamma).unwrap_or(0.0),
    })
}

fn finite_axes(axes: Option<[Option<f64>; 3]>) -> Option<Vector3<f64>> {
    let [x, y, z] = axes?;
    let v = Vector3::new(x?, y?, z?);
    v.iter().all(|c| c.is_finite()).then_some(v)
}

/// Turns raw motion events into gravity-excluded samples.
#[derive(Debug, Clone)]
pub struct MotionNormalizer {
    axis: MountAxis,
    alpha: f64,
    gravity: Option<Vector3<f64>>,
}

impl MotionNormalizer {
    pub fn new(axis: MountAxis, alpha: f64) -> Self {
        Self {
            axis,
            alpha: alpha.clamp(0.0, 1.0),
            gravity: None,
        }
    }

    /// Returns true if the event carries platform-filtered linear
    /// acceleration.
    pub fn has_linear(raw: &RawMotion) -> bool {
        finite_axes(raw.acceleration).is_some()
    }

    /// Converts one event, preferring the platform's linear acceleration
    /// and otherwise subtracting a low-pass gravity estimate.
    pub fn normalize(&mut self, raw: &RawMotion) -> Option<MotionSample> {
        let linear = match finite_axes(raw.acceleration) {
            Some(linear) => linear,
            None => {
                let total = finite_axes(raw.acceleration_including_gravity)?;
                let gravity = match self.gravity {
                    Some(g) => g * self.alpha + total * (1.0 - self.alpha),
                    None => total,
                };
                self.gravity = Some(gravity);
                total - gravity
            }
        };
        Some(MotionSample::from_axes(linear, self.axis.component(&linear)))
    }
}

fn fault_state(fault: PositionFault) -> ChannelState {
    match fault {
        PositionFault::PermissionDenied => {
            ChannelState::Unavailable(SensorError::PermissionDenied(SensorChannel::Position))
        }
        PositionFault::Unavailable(reason) => {
            ChannelState::Unavailable(SensorError::unavailable(SensorChannel::Position, reason))
        }
        PositionFault::Timeout => ChannelState::Degraded("no fix within timeout".into()),
    }
}

/// Forwards a raw stream into the sink with a liveness probe.
///
/// Only events that convert into a sample count as data. If none arrives
/// within `window` of subscribing, the channel is reported unavailable; a
/// late usable event flips it to its live state.
async fn pump_with_liveness<T, L, F>(
    mut rx: UnboundedReceiver<T>,
    sink: SampleSink,
    channel: SensorChannel,
    window: Duration,
    live_state: L,
    mut convert: F,
) where
    L: Fn(&T) -> ChannelState,
    F: FnMut(T) -> Option<SensorEvent>,
{
    let deadline = Instant::now() + window;
    let mut live = false;
    let mut reported_silent = false;

    loop {
        let next = if live || reported_silent {
            rx.recv().await
        } else {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(%channel, window_ms = window.as_millis() as u64, "no sensor data within liveness window");
                    let silent = SensorError::unavailable(
                        channel,
                        format!("no data within {}ms", window.as_millis()),
                    );
                    if sink.status(channel, ChannelState::Unavailable(silent)).is_err() {
                        return;
                    }
                    reported_silent = true;
                    continue;
                }
            }
        };

        let Some(raw) = next else {
            if !live && !reported_silent {
                let _ = sink.status(
                    channel,
                    ChannelState::Unavailable(SensorError::unavailable(channel, "subscription ended")),
                );
            }
            return;
        };

        let state = live_state(&raw);
        let Some(event) = convert(raw) else {
            debug!(%channel, "dropping unusable platform event");
            continue;
        };
        if !live {
            live = true;
            if sink.status(channel, state).is_err() {
                return;
            }
        }
        if sink.emit(event).is_err() {
            return;
        }
    }
}

/// Sensor source backed by the device platform.
pub struct LiveSensorSource<P: PlatformSensors> {
    platform: Arc<P>,
    config: LiveSourceConfig,
    subscriptions: Subscriptions,
}

impl<P: PlatformSensors> LiveSensorSource<P> {
    pub fn new(platform: Arc<P>, config: LiveSourceConfig) -> Self {
        Self {
            platform,
            config,
            subscriptions: Subscriptions::new(),
        }
    }

    pub fn config(&self) -> &LiveSourceConfig {
        &self.config
    }

    fn start_position(&self, sink: SampleSink) -> Result<JoinHandle<()>, SensorError> {
        let mut rx = self.platform.watch_position(&self.config.position)?;
        Ok(tokio::spawn(async move {
            let mut normalizer = PositionNormalizer::default();
            let mut reported_active = false;
            while let Some(event) = rx.recv().await {
                let delivered = match event {
                    Ok(raw) => match normalizer.normalize(&raw) {
                        Some(sample) => {
                            if !reported_active {
                                reported_active = true;
                                let _ = sink.status(SensorChannel::Position, ChannelState::Active);
                            }
                            sink.position(sample)
                        }
                        None => {
                            debug!("dropping position fix without coordinates");
                            Ok(())
                        }
                    },
                    Err(fault) => {
                        warn!(?fault, "position provider fault");
                        reported_active = false;
                        sink.status(SensorChannel::Position, fault_state(fault))
                    }
                };
                if delivered.is_err() {
                    break;
                }
            }
        }))
    }

    fn start_orientation(&self, sink: SampleSink) -> Result<JoinHandle<()>, SensorError> {
        let (rx, degraded) = match self.platform.watch_orientation(OrientationFrame::Absolute) {
            Ok(rx) => (rx, false),
            Err(err) => {
                info!(%err, "absolute orientation unavailable, falling back to relative");
                (self.platform.watch_orientation(OrientationFrame::Relative)?, true)
            }
        };
        let window = Duration::from_millis(self.config.liveness_window_ms);
        Ok(tokio::spawn(pump_with_liveness(
            rx,
            sink,
            SensorChannel::Orientation,
            window,
            move |_| {
                if degraded {
                    ChannelState::Degraded("relative orientation, heading not north-referenced".into())
                } else {
                    ChannelState::Active
                }
            },
            |raw| orientation_from_raw(&raw).map(SensorEvent::Orientation),
        )))
    }

    fn start_motion(&self, sink: SampleSink) -> Result<JoinHandle<()>, SensorError> {
        let rx = self.platform.watch_motion()?;
        let window = Duration::from_millis(self.config.liveness_window_ms);
        let mut normalizer =
            MotionNormalizer::new(self.config.mount_axis, self.config.gravity_filter_alpha);
        Ok(tokio::spawn(pump_with_liveness(
            rx,
            sink,
            SensorChannel::Motion,
            window,
            |raw| {
                if MotionNormalizer::has_linear(raw) {
                    ChannelState::Active
                } else {
                    ChannelState::Degraded("gravity removed in software".into())
                }
            },
            move |raw| normalizer.normalize(&raw).map(SensorEvent::Motion),
        )))
    }
}

#[async_trait]
impl<P: PlatformSensors> SensorSource for LiveSensorSource<P> {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn initialize(&mut self, sink: SampleSink) -> Capabilities {
        self.subscriptions.bind(sink.clone());
        let mut capabilities = Capabilities::default();

        for channel in SensorChannel::all() {
            let permission = self.platform.request_permission(channel).await;
            if !permission.is_allowed() {
                warn!(%channel, "sensor permission denied");
                let _ = sink.status(
                    channel,
                    ChannelState::Unavailable(SensorError::PermissionDenied(channel)),
                );
                continue;
            }

            let started = match channel {
                SensorChannel::Position => self.start_position(sink.clone()),
                SensorChannel::Orientation => self.start_orientation(sink.clone()),
                SensorChannel::Motion => self.start_motion(sink.clone()),
            };
            match started {
                Ok(task) => {
                    self.subscriptions.push(task);
                    capabilities.set(channel, true);
                }
                Err(err) => {
                    warn!(%channel, %err, "sensor subscription failed");
                    let _ = sink.status(channel, ChannelState::Unavailable(err));
                }
            }
        }

        info!(?capabilities, "live sensors initialized");
        capabilities
    }

    fn stop(&mut self) {
        self.subscriptions.cancel();
    }

    fn is_running(&self) -> bool {
        self.subscriptions.is_active()
    }
}
