//! DriveScope Environment Abstraction Layer
//!
//! This crate provides the abstraction allowing the DriveScope pipeline
//! to run against **Device** sensors (tokio + platform bindings) and a
//! **Simulation** (virtual clock + scripted sensors).
//!
//! # What Gets Intercepted
//!
//! - Time (`now()`, `sleep()`, `spawn()`)
//! - Sensors (`SensorSource`, `PlatformSensors`)
//! - Sound output (`ToneSink`)
//! - Settings storage (`SettingsStore`)
//!
//! # Example
//!
//! ```ignore
//! use drivescope_env::{SampleSink, SensorSource};
//!
//! async fn pump<Src: SensorSource>(source: &mut Src) {
//!     let (sink, mut rx) = SampleSink::channel();
//!     let caps = source.initialize(sink).await;
//!     while let Some(event) = rx.recv().await {
//!         handle(event);
//!     }
//! }
//! ```

mod context;
mod error;
mod output;
mod platform;
mod settings;
mod source;
mod tokio_impl;
mod types;

pub use context::SensorContext;
pub use error::SensorError;
pub use output::{RecordingToneSink, Tone, ToneSink, Waveform};
pub use platform::{
    OrientationFrame, PermissionState, PlatformSensors, PositionEvent, PositionFault,
    PositionOptions, RawMotion, RawOrientation, RawPosition,
};
pub use settings::{MemorySettingsStore, SettingsStore, THRESHOLDS_KEY};
pub use source::{SampleReceiver, SampleSink, SensorSource, Subscriptions};
pub use tokio_impl::TokioContext;
pub use types::{
    Capabilities, ChannelState, ChannelStatus, MotionSample, OrientationSample, PositionSample,
    SensorChannel, SensorEvent, SessionId,
};
