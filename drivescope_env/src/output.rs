//! Sound output abstraction and tone description.

use crate::error::SensorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, PoisonError};

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Oscillator value in [-1, 1] at `phase` (cycles, any real value).
    pub fn value(&self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (2.0 * PI * p).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

/// A tone with a linear attack/release envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f64,
    /// Hard stop after this many milliseconds
    pub duration_ms: u64,
    pub waveform: Waveform,
    /// Ramp from silence to `peak_gain`
    pub attack_ms: f64,
    /// Ramp from `peak_gain` to silence, ending at `duration_ms`
    pub release_ms: f64,
    pub peak_gain: f64,
}

impl Tone {
    /// Creates a tone with a 10ms attack, 50ms release and 0.3 peak gain.
    pub fn new(frequency_hz: f64, duration_ms: u64, waveform: Waveform) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            waveform,
            attack_ms: 10.0,
            release_ms: 50.0,
            peak_gain: 0.3,
        }
    }

    pub fn with_envelope(mut self, attack_ms: f64, release_ms: f64) -> Self {
        self.attack_ms = attack_ms.max(0.0);
        self.release_ms = release_ms.max(0.0);
        self
    }

    pub fn with_gain(mut self, peak_gain: f64) -> Self {
        self.peak_gain = peak_gain.clamp(0.0, 1.0);
        self
    }

    /// The inaudible buffer used to fully engage output on devices that
    /// need a first play before they produce sound.
    pub fn silent_primer() -> Self {
        Self::new(0.0, 1, Waveform::Sine)
            .with_envelope(0.0, 0.0)
            .with_gain(0.0)
    }

    /// Envelope gain at `t_ms` after tone start.
    ///
    /// Zero outside `[0, duration_ms)`. Overlapping ramps on short tones
    /// take the lower of the two.
    pub fn gain_at(&self, t_ms: f64) -> f64 {
        let duration = self.duration_ms as f64;
        if !(0.0..duration).contains(&t_ms) {
            return 0.0;
        }
        let rise = if self.attack_ms > 0.0 {
            t_ms / self.attack_ms
        } else {
            1.0
        };
        let fall = if self.release_ms > 0.0 {
            (duration - t_ms) / self.release_ms
        } else {
            1.0
        };
        self.peak_gain * rise.min(fall).min(1.0)
    }

    /// Renders the tone to mono PCM at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let count = (self.duration_ms * sample_rate as u64 / 1000) as usize;
        let rate = sample_rate as f64;
        (0..count)
            .map(|i| {
                let t = i as f64 / rate;
                let osc = self.waveform.value(self.frequency_hz * t);
                (osc * self.gain_at(t * 1000.0)) as f32
            })
            .collect()
    }
}

/// The platform's sound output device.
///
/// # Implementations
///
/// - **Device**: a binding to the host's audio synthesis facility
/// - **Testing/Simulation**: `RecordingToneSink`
#[async_trait]
pub trait ToneSink: Send {
    /// Arms the device. Must be reached from a user-initiated interaction
    /// on platforms that require it.
    async fn resume(&mut self) -> Result<(), SensorError>;

    /// Returns true if the device needs a silent buffer played after
    /// resuming before it produces sound.
    fn needs_priming(&self) -> bool {
        false
    }

    /// Schedules a tone to start now. Must not suspend.
    fn start(&mut self, tone: &Tone) -> Result<(), SensorError>;
}

#[derive(Debug, Default)]
struct Recording {
    resumed: bool,
    tones: Vec<Tone>,
}

/// A sound device that records what it was asked to play.
///
/// Clones share the same recording, so a test can keep a handle after
/// moving the sink into an engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingToneSink {
    recording: Arc<Mutex<Recording>>,
    priming: bool,
    refuse_resume: bool,
}

impl RecordingToneSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that needs a silent primer after resuming.
    pub fn requiring_priming(mut self) -> Self {
        self.priming = true;
        self
    }

    /// A device that refuses to arm.
    pub fn refusing(mut self) -> Self {
        self.refuse_resume = true;
        self
    }

    /// Every tone started so far, primers included.
    pub fn tones(&self) -> Vec<Tone> {
        self.lock().tones.clone()
    }

    /// Audible tones started so far.
    pub fn audible_tones(&self) -> Vec<Tone> {
        self.lock()
            .tones
            .iter()
            .filter(|t| t.peak_gain > 0.0)
            .copied()
            .collect()
    }

    pub fn is_resumed(&self) -> bool {
        self.lock().resumed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ToneSink for RecordingToneSink {
    async fn resume(&mut self) -> Result<(), SensorError> {
        if self.refuse_resume {
            return Err(SensorError::AudioDevice("device refused to resume".into()));
        }
        self.lock().resumed = true;
        Ok(())
    }

    fn needs_priming(&self) -> bool {
        self.priming
    }

    fn start(&mut self, tone: &Tone) -> Result<(), SensorError> {
        let mut recording = self.lock();
        if !recording.resumed {
            return Err(SensorError::AudioLocked);
        }
        recording.tones.push(*tone);
        Ok(())
    }
}
