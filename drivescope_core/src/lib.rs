//! DriveScope Core - Phone Kinematics Dashboard Pipeline
//!
//! Fuses three independent phone sensor streams into one kinematic picture
//! and raises an audible alert on hard braking:
//! 1. **Aggregation**: position, compass and motion samples merged into a
//!    single `KinematicState` with derived pointer geometry
//! 2. **Braking detection**: a two-state machine over speed and forward
//!    acceleration with tunable thresholds
//! 3. **Alerting**: a debounced, unlock-gated tone engine
//!
//! Sensor sources (live platform or synthetic drive) plug in behind
//! `drivescope_env::SensorSource`; everything here is source-agnostic.

pub mod audio;
pub mod braking;
pub mod geo_units;
pub mod kinematics;
pub mod live_source;
pub mod presentation;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use audio::{AudioAlertEngine, AudioConfig, AudioState};
pub use braking::{
    BrakingAlertState, BrakingDetector, BrakingState, BrakingThresholds, BrakingTransition,
    ThresholdPreset,
};
pub use kinematics::{DisplayVectors, KinematicAggregator, KinematicState};
pub use live_source::{LiveSensorSource, LiveSourceConfig, MountAxis};
pub use presentation::{AccelerationLevel, DisplaySnapshot};
pub use session::{DashboardSession, SessionConfig, SessionStats, SessionUpdate};
