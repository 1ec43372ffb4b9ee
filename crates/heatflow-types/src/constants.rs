//! Simulation defaults and shared constants.

/// Default multiplicative decay applied to every cell after each iteration.
pub const DEFAULT_DECAY_RATE: f64 = 0.02;

/// Cell-type symbol that marks a fluid cell. Every other symbol is a boundary.
pub const FLUID_SYMBOL: u8 = b'F';

/// Entry point name of the diffusion kernel.
pub const DIFFUSION_ENTRY_POINT: &str = "temperature_calculations";

/// Values within this distance of zero are rendered as neutral.
pub const NEUTRAL_EPSILON: f64 = 1.0e-6;

/// Number of kernel parameters: (current, cell types, dimensions, next).
pub const KERNEL_ARG_COUNT: u32 = 4;

/// Work-group limit reported by the CPU reference backend.
pub const DEFAULT_MAX_WORK_GROUP_SIZE: usize = 256;
