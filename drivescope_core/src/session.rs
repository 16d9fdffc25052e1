//! Dashboard Session - wires a sensor source into the pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  SampleSink   ┌──────────────────────────────────────┐
//! │ SensorSource │ ────────────► │           DashboardSession           │
//! │ (live/synth) │               │  ┌────────────┐   ┌───────────────┐  │
//! └──────────────┘               │  │ Kinematic  │──►│   Braking     │  │
//!                                │  │ Aggregator │   │   Detector    │  │
//!                                │  └────────────┘   └───────┬───────┘  │
//!                                │                           ▼          │
//!                                │                   ┌───────────────┐  │
//!                                │                   │ Audio Engine  │  │
//!                                │                   └───────────────┘  │
//!                                └──────────────────────────────────────┘
//!                                                │ DisplaySnapshot
//!                                                ▼
//!                                          presentation
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use drivescope_core::session::{DashboardSession, SessionConfig};
//! use drivescope_env::{RecordingToneSink, TokioContext};
//!
//! let mut session = DashboardSession::new(TokioContext::shared(), sink, SessionConfig::default());
//! session.attach(&mut source).await;
//! while let Some(update) = session.next_update().await {
//!     render(update);
//! }
//! ```

use crate::audio::{AudioAlertEngine, AudioConfig};
use crate::braking::{BrakingDetector, BrakingThresholds, BrakingTransition};
use crate::kinematics::{KinematicAggregator, KinematicState};
use crate::live_source::{LiveSensorSource, LiveSourceConfig};
use crate::presentation::DisplaySnapshot;
use drivescope_env::{
    Capabilities, ChannelState, PlatformSensors, SampleReceiver, SampleSink, SensorChannel,
    SensorContext, SensorError, SensorEvent, SensorSource, SessionId, SettingsStore, ToneSink,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for a dashboard session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session's logical name (for logging)
    pub name: String,

    /// Braking trigger thresholds (default: operational preset)
    pub thresholds: BrakingThresholds,

    pub audio: AudioConfig,

    /// Used when the session builds a live source
    pub live: LiveSourceConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "drivescope".to_string(),
            thresholds: BrakingThresholds::default(),
            audio: AudioConfig::default(),
            live: LiveSourceConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Builds a live source over `platform` with this session's settings.
    pub fn live_source<P: PlatformSensors>(&self, platform: Arc<P>) -> LiveSensorSource<P> {
        LiveSensorSource::new(platform, self.live.clone())
    }
}

/// Running counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub events: u64,
    pub position_samples: u64,
    pub orientation_samples: u64,
    pub motion_samples: u64,
    pub status_changes: u64,
    /// Samples rejected as malformed
    pub dropped: u64,
    pub braking_episodes: u64,
    pub alerts_fired: u64,
    /// Alerts refused while locked or debounced
    pub alerts_suppressed: u64,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// State changed; here is what to show
    Snapshot(DisplaySnapshot),
    /// Sample was malformed and left state untouched
    Dropped(SensorError),
}

fn channel_index(channel: SensorChannel) -> usize {
    match channel {
        SensorChannel::Position => 0,
        SensorChannel::Orientation => 1,
        SensorChannel::Motion => 2,
    }
}

/// Explicit session context owning every pipeline component.
///
/// Generic over the context and the sound device, so the same session runs
/// on a device and inside the simulator.
pub struct DashboardSession<Ctx, S>
where
    Ctx: SensorContext,
    S: ToneSink,
{
    /// Session identifier
    pub id: SessionId,

    context: Arc<Ctx>,
    config: SessionConfig,
    aggregator: KinematicAggregator,
    detector: BrakingDetector,
    audio: AudioAlertEngine<S, Ctx>,
    channels: [ChannelState; 3],
    capabilities: Capabilities,
    receiver: Option<SampleReceiver>,
    stats: SessionStats,
}

impl<Ctx, S> DashboardSession<Ctx, S>
where
    Ctx: SensorContext,
    S: ToneSink,
{
    pub fn new(context: Arc<Ctx>, tone_sink: S, config: SessionConfig) -> Self {
        let audio = AudioAlertEngine::new(tone_sink, context.clone(), config.audio.clone());
        Self {
            id: SessionId::new(),
            detector: BrakingDetector::new(config.thresholds),
            aggregator: KinematicAggregator::new(),
            audio,
            context,
            config,
            channels: [ChannelState::Pending, ChannelState::Pending, ChannelState::Pending],
            capabilities: Capabilities::default(),
            receiver: None,
            stats: SessionStats::default(),
        }
    }

    /// Replaces the random session id (simulation uses seeded ids).
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    /// Initializes `source` with a fresh sink and starts listening to it.
    ///
    /// Any previously attached channel is dropped. Suspends while the source
    /// waits for permission prompts.
    pub async fn attach<Src>(&mut self, source: &mut Src) -> Capabilities
    where
        Src: SensorSource + ?Sized,
    {
        let (sink, receiver) = SampleSink::channel();
        self.receiver = Some(receiver);
        self.channels = [ChannelState::Pending, ChannelState::Pending, ChannelState::Pending];

        let capabilities = source.initialize(sink).await;
        self.capabilities = capabilities;
        info!(
            session = %self.id,
            name = %self.config.name,
            source = source.name(),
            ?capabilities,
            "sensor source attached"
        );
        capabilities
    }

    /// Waits for the next event and applies it.
    ///
    /// Returns `None` once the source is detached or its sink is gone.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let event = self.receiver.as_mut()?.recv().await?;
        Some(self.handle_event(event))
    }

    /// Applies the next queued event, if one is waiting.
    pub fn try_next_update(&mut self) -> Option<SessionUpdate> {
        let event = self.receiver.as_mut()?.try_recv().ok()?;
        Some(self.handle_event(event))
    }

    /// Applies every event already queued, without waiting.
    pub fn drain_pending(&mut self) -> Vec<SessionUpdate> {
        std::iter::from_fn(|| self.try_next_update()).collect()
    }

    /// Applies one event to the pipeline.
    pub fn handle_event(&mut self, event: SensorEvent) -> SessionUpdate {
        let now = self.context.now_millis();
        self.stats.events += 1;

        let applied = match &event {
            SensorEvent::Position(sample) => {
                self.stats.position_samples += 1;
                self.aggregator.on_position(sample, now)
            }
            SensorEvent::Orientation(sample) => {
                self.stats.orientation_samples += 1;
                self.aggregator.on_orientation(sample, now)
            }
            SensorEvent::Motion(sample) => {
                self.stats.motion_samples += 1;
                self.aggregator
                    .on_motion(sample, now)
                    .map(|forward| self.on_forward_acceleration(forward, now))
            }
            SensorEvent::Status(status) => {
                self.stats.status_changes += 1;
                self.on_status(status.channel, status.state.clone());
                Ok(())
            }
        };

        match applied {
            Ok(()) => SessionUpdate::Snapshot(self.snapshot()),
            Err(err) => {
                self.stats.dropped += 1;
                SessionUpdate::Dropped(err)
            }
        }
    }

    fn on_forward_acceleration(&mut self, forward: f64, now: u64) {
        let speed = self.aggregator.state().speed_mps;
        if self.detector.update(speed, forward) != BrakingTransition::Entered {
            return;
        }
        self.stats.braking_episodes += 1;

        match self.audio.try_play_brake_alert() {
            Ok(()) => {
                self.detector.record_alert(now);
                self.stats.alerts_fired += 1;
                info!(session = %self.id, speed_mps = speed, forward, "brake alert");
            }
            Err(err) if err.is_audio_suppression() => {
                self.stats.alerts_suppressed += 1;
                debug!(session = %self.id, %err, "brake alert suppressed");
            }
            Err(err) => {
                warn!(session = %self.id, %err, "brake alert failed");
            }
        }
    }

    fn on_status(&mut self, channel: SensorChannel, state: ChannelState) {
        match &state {
            ChannelState::Unavailable(err) => warn!(session = %self.id, %channel, %err, "channel unavailable"),
            ChannelState::Degraded(reason) => warn!(session = %self.id, %channel, %reason, "channel degraded"),
            _ => info!(session = %self.id, %channel, state = state.label(), "channel status"),
        }
        self.capabilities.set(channel, state.is_delivering() || state == ChannelState::Pending);
        self.channels[channel_index(channel)] = state;
    }

    /// Stops `source` and closes the channel. Nothing is applied afterwards.
    pub fn detach<Src>(&mut self, source: &mut Src)
    where
        Src: SensorSource + ?Sized,
    {
        source.stop();
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
        }
        info!(session = %self.id, source = source.name(), "sensor source detached");
    }

    /// Arms audio output. Call from a user interaction.
    pub async fn unlock_audio(&mut self) -> Result<(), SensorError> {
        self.audio.unlock().await
    }

    /// Swaps the braking thresholds after validating them.
    pub fn apply_thresholds(&mut self, thresholds: BrakingThresholds) -> Result<(), SensorError> {
        thresholds.validate()?;
        self.detector.set_thresholds(thresholds);
        self.config.thresholds = thresholds;
        info!(
            session = %self.id,
            speed_threshold_mps = thresholds.speed_threshold_mps,
            brake_threshold_mps2 = thresholds.brake_threshold_mps2,
            "braking thresholds applied"
        );
        Ok(())
    }

    /// Applies thresholds from `store` if any are saved.
    ///
    /// # Returns
    /// * `Ok(true)` - Stored thresholds applied
    /// * `Ok(false)` - Nothing stored, current thresholds kept
    pub fn load_thresholds(&mut self, store: &dyn SettingsStore) -> Result<bool, SensorError> {
        match BrakingThresholds::load_from(store)? {
            Some(thresholds) => self.apply_thresholds(thresholds).map(|_| true),
            None => Ok(false),
        }
    }

    /// Current display values.
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot::build(
            self.context.now_millis(),
            self.aggregator.state(),
            &self.aggregator.vectors(),
            &self.detector.alert_state(),
            &self.channels,
            self.audio.is_unlocked(),
        )
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn state(&self) -> &KinematicState {
        self.aggregator.state()
    }

    pub fn detector(&self) -> &BrakingDetector {
        &self.detector
    }

    pub fn audio(&self) -> &AudioAlertEngine<S, Ctx> {
        &self.audio
    }

    pub fn channel_state(&self, channel: SensorChannel) -> &ChannelState {
        &self.channels[channel_index(channel)]
    }

    /// Channels the attached source is still expected to deliver.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.receiver.is_some()
    }
}
