//! Audio Alert Engine
//!
//! Plays envelope-shaped tones through a `ToneSink`, gated by an explicit
//! unlock and a minimum interval between beeps.

use drivescope_env::{SensorContext, SensorError, Tone, ToneSink, Waveform};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for the audio engine.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Minimum time between two beep starts (default: 1000)
    pub debounce_ms: u64,

    /// Linear fade-in (default: 10)
    pub attack_ms: f64,

    /// Linear fade-out ending at the hard stop (default: 50)
    pub release_ms: f64,

    /// Sustain gain in [0, 1] (default: 0.3)
    pub peak_gain: f64,

    /// Brake alert tone (default: 880 Hz, 150 ms, sine)
    pub alert_frequency_hz: f64,
    pub alert_duration_ms: u64,
    pub alert_waveform: Waveform,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            attack_ms: 10.0,
            release_ms: 50.0,
            peak_gain: 0.3,
            alert_frequency_hz: 880.0,
            alert_duration_ms: 150,
            alert_waveform: Waveform::Sine,
        }
    }
}

/// Whether the sound device has been armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Locked,
    Unlocked,
}

/// Debounced tone player.
///
/// Every method takes `&mut self`, so the debounce check and the
/// timestamp update can never be split by another caller.
pub struct AudioAlertEngine<S, Ctx>
where
    S: ToneSink,
    Ctx: SensorContext,
{
    sink: S,
    clock: Arc<Ctx>,
    config: AudioConfig,
    state: AudioState,
    last_beep_ms: Option<u64>,
    played: u64,
    suppressed: u64,
}

impl<S, Ctx> AudioAlertEngine<S, Ctx>
where
    S: ToneSink,
    Ctx: SensorContext,
{
    pub fn new(sink: S, clock: Arc<Ctx>, config: AudioConfig) -> Self {
        Self {
            sink,
            clock,
            config,
            state: AudioState::Locked,
            last_beep_ms: None,
            played: 0,
            suppressed: 0,
        }
    }

    /// Arms the sound device.
    ///
    /// Call from a user-initiated interaction. Devices that need it get a
    /// silent primer after resuming. Calling again once unlocked is a no-op.
    pub async fn unlock(&mut self) -> Result<(), SensorError> {
        if self.state == AudioState::Unlocked {
            return Ok(());
        }
        self.sink.resume().await?;
        if self.sink.needs_priming() {
            self.sink.start(&Tone::silent_primer())?;
        }
        self.state = AudioState::Unlocked;
        info!("audio output unlocked");
        Ok(())
    }

    /// Starts a tone, subject to unlock and debounce.
    ///
    /// # Returns
    /// * `Err(SensorError::AudioLocked)` - `unlock` has not succeeded yet
    /// * `Err(SensorError::Debounced)` - Previous beep started too recently
    /// * `Err(SensorError::AudioDevice)` - Device refused the tone
    pub fn try_play_beep(
        &mut self,
        frequency_hz: f64,
        duration_ms: u64,
        waveform: Waveform,
    ) -> Result<(), SensorError> {
        if self.state == AudioState::Locked {
            self.suppressed += 1;
            return Err(SensorError::AudioLocked);
        }

        let now = self.clock.now_millis();
        if let Some(last) = self.last_beep_ms {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.config.debounce_ms {
                self.suppressed += 1;
                let remaining_ms = self.config.debounce_ms - elapsed;
                debug!(remaining_ms, "beep debounced");
                return Err(SensorError::Debounced { remaining_ms });
            }
        }

        let tone = Tone::new(frequency_hz, duration_ms, waveform)
            .with_envelope(self.config.attack_ms, self.config.release_ms)
            .with_gain(self.config.peak_gain);
        self.sink.start(&tone)?;

        self.last_beep_ms = Some(now);
        self.played += 1;
        Ok(())
    }

    /// `try_play_beep` reduced to success/failure.
    pub fn play_beep(&mut self, frequency_hz: f64, duration_ms: u64, waveform: Waveform) -> bool {
        self.try_play_beep(frequency_hz, duration_ms, waveform).is_ok()
    }

    /// The fixed brake alert tone.
    pub fn try_play_brake_alert(&mut self) -> Result<(), SensorError> {
        self.try_play_beep(
            self.config.alert_frequency_hz,
            self.config.alert_duration_ms,
            self.config.alert_waveform,
        )
    }

    pub fn play_brake_alert(&mut self) -> bool {
        self.try_play_brake_alert().is_ok()
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == AudioState::Unlocked
    }

    pub fn last_beep_ms(&self) -> Option<u64> {
        self.last_beep_ms
    }

    /// Beeps that actually started.
    pub fn played_count(&self) -> u64 {
        self.played
    }

    /// Beeps refused for being locked or debounced.
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}
