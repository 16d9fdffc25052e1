//! Sensor source abstraction and the push channel it delivers into.

use crate::error::SensorError;
use crate::types::{
    Capabilities, ChannelState, ChannelStatus, MotionSample, OrientationSample, PositionSample,
    SensorChannel, SensorEvent,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receiving end of a sample channel, owned by the session.
pub type SampleReceiver = mpsc::UnboundedReceiver<SensorEvent>;

/// Push channel a source delivers its events into.
///
/// All three sample streams share one queue, so arrival order within each
/// stream is preserved. Closing the sink makes every later `emit` a no-op,
/// which is what gives `SensorSource::stop` its "nothing after return"
/// guarantee on a single-threaded runtime.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: mpsc::UnboundedSender<SensorEvent>,
    open: Arc<AtomicBool>,
}

impl SampleSink {
    /// Creates a connected sink/receiver pair.
    pub fn channel() -> (SampleSink, SampleReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = SampleSink {
            tx,
            open: Arc::new(AtomicBool::new(true)),
        };
        (sink, rx)
    }

    /// Pushes an event downstream.
    ///
    /// # Returns
    /// * `Ok(())` - Event queued
    /// * `Err(SensorError::ChannelClosed)` - Sink closed or receiver dropped
    pub fn emit(&self, event: SensorEvent) -> Result<(), SensorError> {
        if !self.is_open() {
            return Err(SensorError::ChannelClosed);
        }
        self.tx.send(event).map_err(|_| SensorError::ChannelClosed)
    }

    pub fn position(&self, sample: PositionSample) -> Result<(), SensorError> {
        self.emit(SensorEvent::Position(sample))
    }

    pub fn orientation(&self, sample: OrientationSample) -> Result<(), SensorError> {
        self.emit(SensorEvent::Orientation(sample))
    }

    pub fn motion(&self, sample: MotionSample) -> Result<(), SensorError> {
        self.emit(SensorEvent::Motion(sample))
    }

    pub fn status(&self, channel: SensorChannel, state: ChannelState) -> Result<(), SensorError> {
        self.emit(SensorEvent::Status(ChannelStatus::new(channel, state)))
    }

    /// Stops delivery. Shared by every clone of this sink.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

/// Background tasks feeding one sink.
///
/// Cancelling is all-or-nothing: the sink is closed first, then every task
/// is aborted.
#[derive(Debug, Default)]
pub struct Subscriptions {
    sink: Option<SampleSink>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the sink these subscriptions deliver into.
    pub fn bind(&mut self, sink: SampleSink) {
        self.cancel();
        self.sink = Some(sink);
    }

    pub fn sink(&self) -> Option<&SampleSink> {
        self.sink.as_ref()
    }

    pub fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub fn is_active(&self) -> bool {
        self.sink.as_ref().map(SampleSink::is_open).unwrap_or(false)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Closes the sink and aborts every task.
    pub fn cancel(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A producer of position, orientation and motion samples.
///
/// # Implementations
///
/// - **Device**: `LiveSensorSource` - wraps the platform's sensor providers
/// - **Simulation**: `SyntheticSensorSource` - scripted drive scenario
///
/// Both honor the same contract, so everything downstream is
/// source-agnostic.
#[async_trait]
pub trait SensorSource: Send {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Starts all channels the source can provide, delivering into `sink`.
    ///
    /// May suspend while the platform prompts for permission. Channel
    /// failures are reported as `SensorEvent::Status` on the sink and as
    /// `false` in the returned capabilities; they never abort the others.
    async fn initialize(&mut self, sink: SampleSink) -> Capabilities;

    /// Releases every subscription and timer. No event is delivered after
    /// this returns.
    fn stop(&mut self);

    /// Returns true between `initialize` and `stop`.
    fn is_running(&self) -> bool;
}
