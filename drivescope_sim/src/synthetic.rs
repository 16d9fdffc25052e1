//! Synthetic Sensor Source - drives the pipeline from the scenario model.

use crate::drive_model::{DriveModel, SimConfig};
use async_trait::async_trait;
use drivescope_env::{
    Capabilities, ChannelState, SampleSink, SensorChannel, SensorContext, SensorSource,
    Subscriptions,
};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info};

fn epoch_millis<Ctx: SensorContext>(ctx: &Ctx) -> i64 {
    ctx.system_time()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Sensor source fed by a `DriveModel` on the context's clock.
///
/// Every tick emits one position, one orientation and one motion sample,
/// in that order. The run ends after `SimConfig::duration_secs`.
pub struct SyntheticSensorSource<Ctx: SensorContext> {
    context: Arc<Ctx>,
    config: SimConfig,
    rng: Option<ChaCha8Rng>,
    subscriptions: Subscriptions,
    ticks: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl<Ctx: SensorContext> SyntheticSensorSource<Ctx> {
    pub fn new(context: Arc<Ctx>, config: SimConfig, rng: ChaCha8Rng) -> Self {
        Self {
            context,
            config,
            rng: Some(rng),
            subscriptions: Subscriptions::new(),
            ticks: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ticks emitted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Returns true once the scripted duration has been fully emitted.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[async_trait]
impl<Ctx: SensorContext> SensorSource for SyntheticSensorSource<Ctx> {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn initialize(&mut self, sink: SampleSink) -> Capabilities {
        self.subscriptions.bind(sink.clone());

        // One scripted drive per source
        let Some(rng) = self.rng.take() else {
            for channel in SensorChannel::all() {
                let _ = sink.status(
                    channel,
                    ChannelState::Unavailable(drivescope_env::SensorError::unavailable(
                        channel,
                        "synthetic drive already played",
                    )),
                );
            }
            return Capabilities::default();
        };

        for channel in SensorChannel::all() {
            let _ = sink.status(channel, ChannelState::Active);
        }

        let mut model = DriveModel::new(&self.config, rng);
        let period = Duration::from_secs_f64(self.config.tick_secs());
        let total = self.config.total_ticks();
        let clock = self.context.clone();
        let ticks = self.ticks.clone();
        let finished = self.finished.clone();

        let task = self.context.spawn("synthetic-drive", async move {
            for _ in 0..total {
                clock.sleep(period).await;
                let frame = model.step(epoch_millis(clock.as_ref()));
                let delivered = sink
                    .position(frame.position)
                    .and_then(|_| sink.orientation(frame.orientation))
                    .and_then(|_| sink.motion(frame.motion));
                if delivered.is_err() {
                    debug!("synthetic drive stopped by consumer");
                    return;
                }
                ticks.fetch_add(1, Ordering::SeqCst);
            }
            finished.store(true, Ordering::SeqCst);
            info!(ticks = total, "synthetic drive complete");
        });
        self.subscriptions.push(task);

        Capabilities::all()
    }

    fn stop(&mut self) {
        self.subscriptions.cancel();
    }

    fn is_running(&self) -> bool {
        self.subscriptions.is_active()
    }
}
