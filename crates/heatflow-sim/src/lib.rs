//! # heatflow-sim
//!
//! Simulation driver: configuration, device context and the
//! per-iteration protocol.
//!
//! ## Key Types
//!
//! - [`SimulationConfig`]: Iterations, decay rate, launch geometry
//! - [`HeatflowConfig`]: The TOML file, `[simulation]` and `[render]` tables
//! - [`SimulationContext`]: Grid plus the device resources it is mirrored into
//! - [`SimulationDriver`]: Runs the iteration loop, emits telemetry and frames
//! - [`RunSummary`]: What a completed run reports back

pub mod config;
pub mod context;
pub mod driver;

pub use config::{BackendKind, HeatflowConfig, RenderConfig, SimulationConfig, SimulationSettings};
pub use context::{KernelBuffers, SimulationContext};
pub use driver::{RunSummary, SimulationDriver};
