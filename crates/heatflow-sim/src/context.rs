//! Simulation context: the grid plus the device resources mirroring it.
//!
//! Device buffers and the kernel are created once in
//! [`SimulationContext::new`] and released exactly once when the context
//! is dropped, on success and error paths alike.

use heatflow_gpu::{AccessMode, BufferHandle, ComputeBackend, KernelHandle, DIFFUSION_WGSL};
use heatflow_grid::Grid;
use heatflow_types::constants::DIFFUSION_ENTRY_POINT;
use heatflow_types::{DeviceResultExt, HeatflowResult};

/// Device buffers bound to the diffusion kernel, in parameter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelBuffers {
    pub current: BufferHandle,
    pub cell_types: BufferHandle,
    pub dimensions: BufferHandle,
    pub next: BufferHandle,
}

impl KernelBuffers {
    /// Handles in kernel parameter order.
    pub fn in_order(&self) -> [BufferHandle; 4] {
        [self.current, self.cell_types, self.dimensions, self.next]
    }
}

/// Owns a backend and releases every resource it recorded.
pub(crate) struct Device {
    pub(crate) backend: Box<dyn ComputeBackend>,
    kernels: Vec<KernelHandle>,
    buffers: Vec<BufferHandle>,
}

impl Device {
    fn new(backend: Box<dyn ComputeBackend>) -> Self {
        Self {
            backend,
            kernels: Vec::new(),
            buffers: Vec::new(),
        }
    }

    #[track_caller]
    fn compile_kernel(&mut self, source: &str, entry_point: &str) -> HeatflowResult<KernelHandle> {
        let kernel = self
            .backend
            .compile_kernel(source, entry_point)
            .on_device("compile_kernel")?;
        self.kernels.push(kernel);
        Ok(kernel)
    }

    #[track_caller]
    fn create_buffer(&mut self, access: AccessMode, size_bytes: usize) -> HeatflowResult<BufferHandle> {
        let buffer = self
            .backend
            .create_buffer(access, size_bytes)
            .on_device("create_buffer")?;
        self.buffers.push(buffer);
        Ok(buffer)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        for buffer in self.buffers.drain(..).rev() {
            if let Err(e) = self.backend.release_buffer(buffer) {
                tracing::warn!(buffer = buffer.0, error = %e, "release_buffer failed");
            }
        }
        for kernel in self.kernels.drain(..).rev() {
            if let Err(e) = self.backend.release_kernel(kernel) {
                tracing::warn!(kernel = kernel.0, error = %e, "release_kernel failed");
            }
        }
        tracing::debug!(backend = self.backend.name(), "released device resources");
    }
}

/// Grid state plus its device mirror.
///
/// Constructed once after load and passed to the driver; the grid is
/// held exclusively here for the lifetime of the run.
pub struct SimulationContext {
    pub(crate) grid: Grid,
    pub(crate) kernel: KernelHandle,
    pub(crate) buffers: KernelBuffers,
    pub(crate) device: Device,
}

impl SimulationContext {
    /// Compiles the diffusion kernel and allocates the four device buffers.
    ///
    /// Resources created before a failure are released before the error
    /// is returned.
    pub fn new(grid: Grid, backend: Box<dyn ComputeBackend>) -> HeatflowResult<Self> {
        let mut device = Device::new(backend);
        let kernel = device.compile_kernel(DIFFUSION_WGSL, DIFFUSION_ENTRY_POINT)?;

        let temperature_bytes = std::mem::size_of_val(grid.current());
        let buffers = KernelBuffers {
            current: device.create_buffer(AccessMode::ReadOnly, temperature_bytes)?,
            cell_types: device.create_buffer(AccessMode::ReadOnly, grid.cell_types().len())?,
            dimensions: device.create_buffer(AccessMode::ReadOnly, std::mem::size_of::<[u32; 2]>())?,
            next: device.create_buffer(AccessMode::ReadWrite, temperature_bytes)?,
        };

        tracing::info!(
            backend = device.backend.name(),
            gpu = device.backend.is_gpu(),
            cells = grid.len(),
            "device context ready"
        );

        Ok(Self {
            grid,
            kernel,
            buffers,
            device,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn buffers(&self) -> KernelBuffers {
        self.buffers
    }

    pub fn backend_name(&self) -> &str {
        self.device.backend.name()
    }

    /// Releases the device resources and returns the grid.
    pub fn into_grid(self) -> Grid {
        let Self { grid, device, .. } = self;
        drop(device);
        grid
    }
}
