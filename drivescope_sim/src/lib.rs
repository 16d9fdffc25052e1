//! DriveScope Deterministic Simulation Harness
//!
//! Runs the whole dashboard pipeline on a virtual clock, so a drive plays
//! out identically for a given seed.
//!
//! # Core Principle: One Seed, One Drive
//!
//! Everything a synthetic drive depends on is controlled:
//! - **Time**: `SimContext` advances only when the drive task sleeps
//! - **Sensors**: the `DriveModel` scenario machine produces every sample
//! - **Randomness**: cruise dwell, phase choice and sensor jitter all come
//!   from ChaCha8 streams derived from one 64-bit seed
//!
//! The live source run over `SimPlatform` keeps its liveness window on the
//! tokio clock, since that window is wall-clock time on a device. Session
//! timestamps still come from `SimContext`. Tests pause tokio time to make
//! the window deterministic.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       DriveRunner                        │
//! │  ┌────────────┐    ┌─────────────────────────────────┐   │
//! │  │ DriveModel │───►│ SyntheticSensorSource           │   │
//! │  └────────────┘    │  (or SimPlatform + LiveSource)  │   │
//! │                    └───────────────┬─────────────────┘   │
//! │                                    ▼                     │
//! │                    ┌─────────────────────────────────┐   │
//! │                    │ DashboardSession                │   │
//! │                    └───────────────┬─────────────────┘   │
//! │                                    ▼                     │
//! │                       RunReport / SimExport              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use drivescope_sim::{DriveRunner, SimConfig};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     duration_secs: 120.0,
//!     ..Default::default()
//! };
//!
//! let report = DriveRunner::new(config).run_blocking()?;
//! ```

mod context;
pub mod drive_model;
mod exporter;
mod platform;
mod runner;
mod settings_file;
mod synthetic;

pub use context::SimContext;
pub use drive_model::{DriveFrame, DriveModel, DrivePhase, SimConfig, MAX_DURATION_SECS};
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use platform::{OrientationStyle, PlatformScript, SimPlatform, SimPlatformFeeds};
pub use runner::{DriveRunner, RunError, RunReport};
pub use settings_file::JsonFileSettingsStore;
pub use synthetic::SyntheticSensorSource;
