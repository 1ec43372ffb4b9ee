//! # heatflow-gpu
//!
//! Compute backend abstraction for the heatflow diffusion engine.
//!
//! Provides a [`ComputeBackend`] trait with two implementations:
//! - [`CpuFallback`]: Reference CPU implementation (always available)
//! - `WgpuBackend`: GPU compute via wgpu (cargo feature `wgpu`)
//!
//! Both expose the same device protocol: buffers created with an access
//! mode, kernels compiled by entry point, arguments bound by index,
//! dispatches over work-items grouped into work-groups, and a blocking
//! `finish`.

pub mod backend;
pub mod buffers;
pub mod kernel;

pub use heatflow_types::status;

#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use backend::{ComputeBackend, CpuFallback};
pub use buffers::{AccessMode, BufferHandle};
pub use kernel::{DiffusionKernel, HostKernel, KernelHandle, Launch, DIFFUSION_WGSL};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;
