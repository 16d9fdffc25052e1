//! JSON exporter for recorded drives.
//!
//! Captures display snapshots at a fixed interval plus notable events so a
//! run can be replayed or plotted offline.

use drivescope_core::{BrakingThresholds, DisplaySnapshot, SessionStats};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single recorded frame.
#[derive(Debug, Clone, Serialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub snapshot: DisplaySnapshot,
}

/// Something worth calling out in the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    pub time_sec: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(time_sec: f64, message: impl Into<String>) -> Self {
        Self {
            time_sec,
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(time_sec: f64, message: impl Into<String>) -> Self {
        Self {
            time_sec,
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

/// Complete drive export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Session name
    pub session: String,

    /// Seed used
    pub seed: u64,

    pub thresholds: BrakingThresholds,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Recorded frames
    pub frames: Vec<SimFrame>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,

    /// Final counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(session: &str, seed: u64, thresholds: BrakingThresholds) -> Self {
        Self {
            session: session.to_string(),
            seed,
            thresholds,
            duration_sec: 0.0,
            frames: Vec::new(),
            events: Vec::new(),
            stats: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = self.duration_sec.max(frame.time_sec);
        self.frames.push(frame);
    }

    pub fn add_event(&mut self, event: SimEvent) {
        self.duration_sec = self.duration_sec.max(event.time_sec);
        self.events.push(event);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, duration_sec: f64, stats: SessionStats) {
        self.duration_sec = duration_sec;
        self.stats = Some(stats);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
