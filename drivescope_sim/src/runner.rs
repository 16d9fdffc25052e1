//! Drive runner - plays a full synthetic drive through a dashboard session.

use crate::context::SimContext;
use crate::drive_model::SimConfig;
use crate::exporter::{SimEvent, SimExport, SimFrame};
use crate::synthetic::SyntheticSensorSource;

use drivescope_core::{
    BrakingThresholds, DashboardSession, DisplaySnapshot, SessionConfig, SessionStats,
    SessionUpdate,
};
use drivescope_env::{RecordingToneSink, SensorContext, SensorError, SessionId};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// RNG stream feeding the drive model.
const DRIVE_STREAM: u64 = 1;

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid drive config: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(#[from] SensorError),

    #[error("failed to write export: {0}")]
    Export(#[from] std::io::Error),

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Results from a simulated drive.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Seed used
    pub seed: u64,

    pub session_id: String,

    /// Thresholds the detector ran with
    pub thresholds: BrakingThresholds,

    /// Ticks emitted by the synthetic source
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Updates applied by the session
    pub updates: u64,

    /// Tones that actually reached the sound device
    pub tones_played: usize,

    pub stats: SessionStats,

    /// What the dashboard showed at the end
    pub final_snapshot: DisplaySnapshot,

    /// Where the frame export went, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<PathBuf>,
}

/// Runs a synthetic drive end to end on a virtual clock.
pub struct DriveRunner {
    config: SimConfig,
    session: SessionConfig,
    unlock_audio: bool,
    export_path: Option<PathBuf>,
    export_interval: u64,
}

impl DriveRunner {
    /// Creates a runner with default session settings and audio unlocked.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            session: SessionConfig {
                name: "drivescope-sim".to_string(),
                ..Default::default()
            },
            unlock_audio: true,
            export_path: None,
            export_interval: 10,
        }
    }

    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the braking thresholds.
    pub fn with_thresholds(mut self, thresholds: BrakingThresholds) -> Self {
        self.session.thresholds = thresholds;
        self
    }

    /// Skips the audio unlock, as if the user never tapped the screen.
    pub fn with_audio_locked(mut self) -> Self {
        self.unlock_audio = false;
        self
    }

    /// Records a frame every `interval` updates to `path`.
    pub fn with_export(mut self, path: impl Into<PathBuf>, interval: u64) -> Self {
        self.export_path = Some(path.into());
        self.export_interval = interval.max(1);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs on a fresh current-thread runtime.
    pub fn run_blocking(&self) -> Result<RunReport, RunError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Runtime)?;
        runtime.block_on(self.run())
    }

    /// Runs the drive and returns the report.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        self.config.validate().map_err(RunError::Config)?;
        let seed = self.config.seed;
        info!(seed, duration_secs = self.config.duration_secs, "starting simulated drive");

        let ctx = SimContext::shared(seed);
        let tones = RecordingToneSink::new();
        let mut session = DashboardSession::new(ctx.clone(), tones.clone(), self.session.clone())
            .with_id(SessionId::from_seed(seed));
        self.session.thresholds.validate()?;
        if self.unlock_audio {
            session.unlock_audio().await?;
        }

        let mut source = SyntheticSensorSource::new(
            ctx.clone(),
            self.config.clone(),
            ctx.derive_rng(DRIVE_STREAM),
        );
        let mut export = self
            .export_path
            .as_ref()
            .map(|_| SimExport::new(&self.session.name, seed, self.session.thresholds));

        session.attach(&mut source).await;

        // Past this much virtual time the drive is considered stuck
        let deadline =
            Duration::from_secs_f64(self.config.duration_secs.max(0.0)) + Duration::from_secs(1);
        let mut updates = 0u64;
        let mut counters = SessionStats::default();
        loop {
            // Lets the drive task emit its next tick
            tokio::task::yield_now().await;
            let finished = source.is_finished();

            while let Some(update) = session.try_next_update() {
                updates += 1;
                let stats = session.stats();
                if let Some(export) = export.as_mut() {
                    self.record(&ctx, export, &update, updates, &counters, &stats);
                }
                counters = stats;
            }

            if finished {
                break;
            }
            if ctx.now() > deadline {
                warn!(ticks = source.ticks(), "drive did not finish before its deadline");
                break;
            }
        }

        session.detach(&mut source);

        let stats = session.stats();
        let final_time_secs = ctx.now().as_secs_f64();
        let export_path = match (export.as_mut(), &self.export_path) {
            (Some(export), Some(path)) => {
                export.finalize(final_time_secs, stats);
                export.write_to_file(path)?;
                info!(frames = export.frames.len(), path = %path.display(), "exported drive");
                Some(path.clone())
            }
            _ => None,
        };

        let report = RunReport {
            seed,
            session_id: session.id.to_string(),
            thresholds: session.detector().thresholds(),
            total_ticks: source.ticks(),
            final_time_secs,
            updates,
            tones_played: tones.audible_tones().len(),
            stats,
            final_snapshot: session.snapshot(),
            export_path,
        };
        info!(
            ticks = report.total_ticks,
            braking_episodes = stats.braking_episodes,
            alerts_fired = stats.alerts_fired,
            alerts_suppressed = stats.alerts_suppressed,
            "simulated drive complete"
        );
        Ok(report)
    }

    fn record(
        &self,
        ctx: &SimContext,
        export: &mut SimExport,
        update: &SessionUpdate,
        updates: u64,
        before: &SessionStats,
        after: &SessionStats,
    ) {
        let time_sec = ctx.now().as_secs_f64();
        let snapshot = match update {
            SessionUpdate::Snapshot(snapshot) => snapshot,
            SessionUpdate::Dropped(err) => {
                debug!(%err, "sample dropped");
                export.add_event(SimEvent::info(time_sec, format!("sample dropped: {}", err)));
                return;
            }
        };

        if updates % self.export_interval == 0 {
            export.add_frame(SimFrame {
                time_sec,
                snapshot: snapshot.clone(),
            });
        }
        if after.alerts_fired > before.alerts_fired {
            export.add_event(SimEvent::warn(
                time_sec,
                format!("brake alert at {:.1} km/h", snapshot.speed_kmh),
            ));
        } else if after.alerts_suppressed > before.alerts_suppressed {
            export.add_event(SimEvent::info(time_sec, "brake alert suppressed"));
        }
    }
}
