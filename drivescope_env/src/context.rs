//! Core environment context trait for DriveScope sessions.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

/// The central interface for time and task scheduling.
///
/// This trait abstracts the "real world" so that the pipeline can run
/// against live device sensors and against a deterministic simulation.
///
/// # Implementations
///
/// - **Device**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - virtual clock + seeded RNG
///
/// # Determinism
///
/// Every timestamp the pipeline uses (sample arrival, beep debounce)
/// comes from `now()`, so a simulated clock makes whole sessions
/// reproducible.
#[async_trait]
pub trait SensorContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Monotonic time in whole milliseconds.
    fn now_millis(&self) -> u64 {
        self.now().as_millis() as u64
    }

    /// Returns the wall-clock time for sample timestamps.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task and returns its handle so the owner can
    /// cancel it.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
