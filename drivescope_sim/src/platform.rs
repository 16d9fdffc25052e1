//! Scripted platform for running the live sensor source in simulation.

use crate::drive_model::DriveFrame;
use async_trait::async_trait;
use drivescope_env::{
    OrientationFrame, PermissionState, PlatformSensors, PositionEvent, PositionFault,
    PositionOptions, RawMotion, RawOrientation, RawPosition, SensorChannel, SensorError,
};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// How orientation events are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationStyle {
    /// Counter-clockwise `alpha` only
    W3c,
    /// Clockwise compass heading alongside `alpha`
    Ios,
}

/// What the scripted platform supports and grants.
#[derive(Debug, Clone)]
pub struct PlatformScript {
    /// Channels whose permission prompt is declined
    pub denied: Vec<SensorChannel>,

    /// Whether north-referenced orientation is offered
    pub absolute_orientation: bool,

    /// Whether motion events carry gravity-excluded acceleration
    pub linear_acceleration: bool,

    pub orientation_style: OrientationStyle,
}

impl Default for PlatformScript {
    fn default() -> Self {
        Self {
            denied: Vec::new(),
            absolute_orientation: true,
            linear_acceleration: true,
            orientation_style: OrientationStyle::W3c,
        }
    }
}

/// Sending side of a `SimPlatform`.
#[derive(Debug, Clone)]
pub struct SimPlatformFeeds {
    script: PlatformScript,
    position: mpsc::UnboundedSender<PositionEvent>,
    orientation: mpsc::UnboundedSender<RawOrientation>,
    motion: mpsc::UnboundedSender<RawMotion>,
}

impl SimPlatformFeeds {
    /// Pushes one drive frame as raw platform events.
    ///
    /// Returns false once every subscription has gone away.
    pub fn feed_frame(&self, frame: &DriveFrame) -> bool {
        let p = &frame.position;
        let position = self.position.send(Ok(RawPosition {
            latitude: p.latitude,
            longitude: p.longitude,
            speed: p.speed_mps,
            heading: p.bearing_deg,
            accuracy: p.accuracy_m,
            timestamp_ms: p.timestamp_ms,
        }));

        let azimuth = frame.orientation.azimuth_deg;
        let orientation = self.orientation.send(RawOrientation {
            alpha: Some((360.0 - azimuth) % 360.0),
            beta: Some(frame.orientation.tilt_front_back),
            gamma: Some(frame.orientation.tilt_left_right),
            compass_heading: match self.script.orientation_style {
                OrientationStyle::Ios => Some(azimuth),
                OrientationStyle::W3c => None,
            },
        });

        let a = frame.motion.acceleration;
        let axes = Some([Some(a.x), Some(a.y), Some(a.z)]);
        let motion = self.motion.send(RawMotion {
            acceleration: if self.script.linear_acceleration { axes } else { None },
            acceleration_including_gravity: Some([Some(a.x), Some(a.y), Some(a.z + 9.81)]),
            interval_ms: 1000.0 / 30.0,
        });

        position.is_ok() || orientation.is_ok() || motion.is_ok()
    }

    /// Reports a provider failure instead of a fix.
    pub fn position_fault(&self, fault: PositionFault) -> bool {
        self.position.send(Err(fault)).is_ok()
    }

    pub fn raw_position(&self, raw: RawPosition) -> bool {
        self.position.send(Ok(raw)).is_ok()
    }

    pub fn raw_orientation(&self, raw: RawOrientation) -> bool {
        self.orientation.send(raw).is_ok()
    }

    pub fn raw_motion(&self, raw: RawMotion) -> bool {
        self.motion.send(raw).is_ok()
    }
}

/// Platform whose events come from a `SimPlatformFeeds`.
///
/// Each channel can be watched once.
pub struct SimPlatform {
    script: PlatformScript,
    position: Mutex<Option<mpsc::UnboundedReceiver<PositionEvent>>>,
    orientation: Mutex<Option<mpsc::UnboundedReceiver<RawOrientation>>>,
    motion: Mutex<Option<mpsc::UnboundedReceiver<RawMotion>>>,
}

impl SimPlatform {
    pub fn new(script: PlatformScript) -> (Self, SimPlatformFeeds) {
        let (ptx, prx) = mpsc::unbounded_channel();
        let (otx, orx) = mpsc::unbounded_channel();
        let (mtx, mrx) = mpsc::unbounded_channel();
        let feeds = SimPlatformFeeds {
            script: script.clone(),
            position: ptx,
            orientation: otx,
            motion: mtx,
        };
        let platform = Self {
            script,
            position: Mutex::new(Some(prx)),
            orientation: Mutex::new(Some(orx)),
            motion: Mutex::new(Some(mrx)),
        };
        (platform, feeds)
    }

    pub fn script(&self) -> &PlatformScript {
        &self.script
    }
}

fn take_receiver<T>(
    slot: &Mutex<Option<mpsc::UnboundedReceiver<T>>>,
    channel: SensorChannel,
) -> Result<mpsc::UnboundedReceiver<T>, SensorError> {
    slot.lock()
        .map_err(|_| SensorError::unavailable(channel, "platform state poisoned"))?
        .take()
        .ok_or_else(|| SensorError::unavailable(channel, "already subscribed"))
}

#[async_trait]
impl PlatformSensors for SimPlatform {
    async fn request_permission(&self, channel: SensorChannel) -> PermissionState {
        if self.script.denied.contains(&channel) {
            PermissionState::Denied
        } else if channel == SensorChannel::Position {
            PermissionState::Granted
        } else {
            PermissionState::NotRequired
        }
    }

    fn watch_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<mpsc::UnboundedReceiver<PositionEvent>, SensorError> {
        take_receiver(&self.position, SensorChannel::Position)
    }

    fn watch_orientation(
        &self,
        frame: OrientationFrame,
    ) -> Result<mpsc::UnboundedReceiver<RawOrientation>, SensorError> {
        if frame == OrientationFrame::Absolute && !self.script.absolute_orientation {
            return Err(SensorError::unavailable(
                SensorChannel::Orientation,
                "absolute orientation not supported",
            ));
        }
        take_receiver(&self.orientation, SensorChannel::Orientation)
    }

    fn watch_motion(&self) -> Result<mpsc::UnboundedReceiver<RawMotion>, SensorError> {
        take_receiver(&self.motion, SensorChannel::Motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive_model::{DriveModel, SimConfig};
    use drivescope_core::live_source::{orientation_from_raw, MotionNormalizer, MountAxis};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn frame() -> DriveFrame {
        let mut model = DriveModel::new(&SimConfig::default(), ChaCha8Rng::seed_from_u64(1));
        model.step(0)
    }

    #[tokio::test]
    async fn test_permissions_follow_script() {
        let script = PlatformScript {
            denied: vec![SensorChannel::Motion],
            ..Default::default()
        };
        let (platform, _feeds) = SimPlatform::new(script);
        assert_eq!(
            platform.request_permission(SensorChannel::Position).await,
            PermissionState::Granted
        );
        assert_eq!(
            platform.request_permission(SensorChannel::Motion).await,
            PermissionState::Denied
        );
    }

    #[test]
    fn test_each_channel_watched_once() {
        let (platform, _feeds) = SimPlatform::new(PlatformScript::default());
        assert!(platform.watch_motion().is_ok());
        assert!(matches!(
            platform.watch_motion(),
            Err(SensorError::SensorUnavailable(SensorChannel::Motion, _))
        ));
    }

    #[test]
    fn test_relative_only_platform() {
        let script = PlatformScript {
            absolute_orientation: false,
            ..Default::default()
        };
        let (platform, _feeds) = SimPlatform::new(script);
        assert!(platform.watch_orientation(OrientationFrame::Absolute).is_err());
        assert!(platform.watch_orientation(OrientationFrame::Relative).is_ok());
    }

    #[test]
    fn test_feed_frame_survives_normalization() {
        for style in [OrientationStyle::W3c, OrientationStyle::Ios] {
            let script = PlatformScript {
                orientation_style: style,
                ..Default::default()
            };
            let (platform, feeds) = SimPlatform::new(script);
            let mut orientation = platform.watch_orientation(OrientationFrame::Absolute).unwrap();
            let mut motion = platform.watch_motion().unwrap();

            let frame = frame();
            assert!(feeds.feed_frame(&frame));

            let raw = orientation.try_recv().unwrap();
            let sample = orientation_from_raw(&raw).unwrap();
            approx::assert_relative_eq!(
                sample.azimuth_deg,
                frame.orientation.azimuth_deg,
                epsilon = 1e-9
            );

            let raw = motion.try_recv().unwrap();
            let sample = MotionNormalizer::new(MountAxis::PosY, 0.8).normalize(&raw).unwrap();
            assert_eq!(sample.forward_acceleration, frame.motion.acceleration.y);
        }
    }
}
