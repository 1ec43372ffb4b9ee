//! # heatflow-types
//!
//! Shared types, error types, and simulation constants
//! for the heatflow diffusion engine.
//!
//! This crate has zero domain logic: it defines the vocabulary
//! that all other heatflow crates share.

pub mod constants;
pub mod error;
pub mod scalar;
pub mod status;

pub use error::{DeviceError, DeviceResultExt, HeatflowError, HeatflowResult};
pub use scalar::Scalar;
