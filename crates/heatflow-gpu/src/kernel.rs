//! Kernels: handles, launch geometry, and the built-in diffusion stencil.
//!
//! The CPU fallback runs [`HostKernel`] implementations registered by
//! entry-point name. The wgpu backend compiles [`DIFFUSION_WGSL`], which
//! implements the same stencil as [`DiffusionKernel`].

use heatflow_types::constants::{DIFFUSION_ENTRY_POINT, FLUID_SYMBOL};
use heatflow_types::DeviceError;

use crate::status;

/// WGSL source of the diffusion kernel.
pub const DIFFUSION_WGSL: &str = include_str!("../shaders/diffusion.wgsl");

/// Opaque handle to a compiled kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub u32);

/// Dispatch geometry of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    /// Total number of work-items.
    pub global_size: usize,
    /// Work-items per work-group.
    pub local_size: usize,
}

impl Launch {
    /// Number of work-groups. `local_size` divides `global_size` by the time
    /// a kernel sees the launch.
    pub fn group_count(&self) -> usize {
        self.global_size / self.local_size
    }
}

/// A kernel the CPU fallback can execute.
///
/// Parameters are numbered `0..arity()`. Exactly one parameter,
/// [`output_arg`](HostKernel::output_arg), is written; the remaining
/// ones are passed to [`execute`](HostKernel::execute) as `inputs`,
/// in parameter order.
pub trait HostKernel: Send + Sync {
    /// Number of parameters.
    fn arity(&self) -> u32;

    /// Index of the parameter the kernel writes.
    fn output_arg(&self) -> u32;

    /// Runs every work-item of `launch`.
    fn execute(&self, launch: Launch, inputs: &[&[u8]], output: &mut [u8])
        -> Result<(), DeviceError>;
}

/// Diffusion stencil over a `current`/`next` temperature pair.
///
/// Parameters: `(current: [f64], cell_types: [u8], dims: [u32; 2], next: [f64])`.
///
/// Work-item `w` handles cells `w, w + global, w + 2*global, ...`, so any
/// positive work-item count covers the whole grid. A fluid cell becomes the
/// mean of itself and its in-bounds fluid neighbours `(i±1, j)`, `(i, j±1)`;
/// any other cell is copied unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffusionKernel;

impl DiffusionKernel {
    pub const ENTRY_POINT: &'static str = DIFFUSION_ENTRY_POINT;
}

impl HostKernel for DiffusionKernel {
    fn arity(&self) -> u32 {
        4
    }

    fn output_arg(&self) -> u32 {
        3
    }

    fn execute(
        &self,
        launch: Launch,
        inputs: &[&[u8]],
        output: &mut [u8],
    ) -> Result<(), DeviceError> {
        let [current, cell_types, dims] = inputs else {
            return Err(DeviceError::new(
                status::INVALID_KERNEL_ARGS,
                format!("diffusion kernel expects 3 inputs, got {}", inputs.len()),
            ));
        };
        let current: &[f64] = cast_arg(current, 0)?;
        let dims: &[u32] = cast_arg(dims, 2)?;
        let next: &mut [f64] = bytemuck::try_cast_slice_mut(output).map_err(|e| {
            DeviceError::new(status::INVALID_ARG_SIZE, format!("argument 3: {e}"))
        })?;

        let (width, height) = match dims {
            [w, h, ..] => (*w as usize, *h as usize),
            _ => {
                return Err(DeviceError::new(
                    status::INVALID_ARG_SIZE,
                    "argument 2 must hold [width, height]",
                ))
            }
        };
        let total = width * height;
        if current.len() < total || cell_types.len() < total || next.len() < total {
            return Err(DeviceError::new(
                status::INVALID_ARG_SIZE,
                format!("buffers are smaller than the {width}x{height} grid"),
            ));
        }

        let stride = launch.global_size;
        for group in 0..launch.group_count() {
            for local in 0..launch.local_size {
                let gid = group * launch.local_size + local;
                let mut idx = gid;
                while idx < total {
                    next[idx] = stencil(current, cell_types, width, height, idx);
                    idx += stride;
                }
            }
        }
        Ok(())
    }
}

/// New value of cell `idx`.
fn stencil(current: &[f64], cell_types: &[u8], width: usize, height: usize, idx: usize) -> f64 {
    let fluid = |n: usize| cell_types[n] == FLUID_SYMBOL;
    if !fluid(idx) {
        return current[idx];
    }

    let (i, j) = (idx / height, idx % height);
    let mut sum = current[idx];
    let mut count = 1.0;

    let mut visit = |n: usize| {
        if fluid(n) {
            sum += current[n];
            count += 1.0;
        }
    };
    if i > 0 {
        visit(idx - height);
    }
    if i + 1 < width {
        visit(idx + height);
    }
    if j > 0 {
        visit(idx - 1);
    }
    if j + 1 < height {
        visit(idx + 1);
    }

    sum / count
}

fn cast_arg<T: bytemuck::Pod>(bytes: &[u8], index: u32) -> Result<&[T], DeviceError> {
    bytemuck::try_cast_slice(bytes)
        .map_err(|e| DeviceError::new(status::INVALID_ARG_SIZE, format!("argument {index}: {e}")))
}
