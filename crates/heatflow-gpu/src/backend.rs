//! Compute backend trait and CPU fallback.
//!
//! The [`ComputeBackend`] trait is the device protocol the simulation
//! driver talks to. The [`CpuFallback`] implementation executes kernels
//! sequentially on the host, serving as a reference for correctness.

use std::collections::HashMap;
use std::sync::Arc;

use heatflow_types::constants::DEFAULT_MAX_WORK_GROUP_SIZE;
use heatflow_types::DeviceError;

use crate::buffers::{AccessMode, BufferHandle, DeviceMemory};
use crate::kernel::{DiffusionKernel, HostKernel, KernelHandle, Launch};
use crate::status;

/// Trait for GPU/CPU compute backends.
///
/// Constructing a backend initializes its device and queue; dropping it
/// releases the queue and context. Buffers and kernels are released
/// explicitly through [`release_buffer`](Self::release_buffer) and
/// [`release_kernel`](Self::release_kernel).
///
/// # Protocol
///
/// ```text
/// let k = backend.compile_kernel(src, "entry")?;
/// let b = backend.create_buffer(AccessMode::ReadOnly, bytes)?;
/// backend.write_buffer(b, data)?;
/// backend.set_kernel_arg(k, 0, b)?;
/// backend.enqueue_kernel(k, global, local)?;
/// backend.finish()?;
/// backend.read_buffer(out, dst)?;
/// ```
///
/// # Implementations
/// - [`CpuFallback`]: Sequential CPU reference (always available)
/// - `WgpuBackend`: GPU compute via wgpu (feature `wgpu`)
pub trait ComputeBackend: Send {
    /// Returns the backend name (e.g., "cpu_fallback", "wgpu").
    fn name(&self) -> &str;

    /// Returns true if the backend runs on a GPU.
    fn is_gpu(&self) -> bool;

    /// Compiles `source` and returns a handle to its `entry_point`.
    fn compile_kernel(&mut self, source: &str, entry_point: &str)
        -> Result<KernelHandle, DeviceError>;

    /// Allocates a device buffer of `size_bytes` bytes.
    fn create_buffer(
        &mut self,
        access: AccessMode,
        size_bytes: usize,
    ) -> Result<BufferHandle, DeviceError>;

    /// Blocking host-to-device copy into the start of `buffer`.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), DeviceError>;

    /// Blocking device-to-host copy from the start of `buffer`.
    fn read_buffer(&mut self, buffer: BufferHandle, out: &mut [u8]) -> Result<(), DeviceError>;

    /// Binds `buffer` to parameter `index` of `kernel`.
    fn set_kernel_arg(
        &mut self,
        kernel: KernelHandle,
        index: u32,
        buffer: BufferHandle,
    ) -> Result<(), DeviceError>;

    /// Largest work-group size the device supports for `kernel`.
    fn max_work_group_size(&self, kernel: KernelHandle) -> Result<usize, DeviceError>;

    /// Queues `kernel` over `global_size` work-items in groups of `local_size`.
    fn enqueue_kernel(
        &mut self,
        kernel: KernelHandle,
        global_size: usize,
        local_size: usize,
    ) -> Result<(), DeviceError>;

    /// Blocks until every queued command has completed.
    fn finish(&mut self) -> Result<(), DeviceError>;

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError>;

    fn release_kernel(&mut self, kernel: KernelHandle) -> Result<(), DeviceError>;
}

/// Validates a launch against a kernel's work-group limit.
///
/// Shared by every backend so that the same launches fail everywhere.
pub fn check_launch(global_size: usize, local_size: usize, max: usize) -> Result<Launch, DeviceError> {
    if global_size == 0 {
        return Err(DeviceError::new(
            status::INVALID_GLOBAL_WORK_SIZE,
            "global work size must be positive",
        ));
    }
    if local_size == 0 || local_size > max {
        return Err(DeviceError::new(
            status::INVALID_WORK_GROUP_SIZE,
            format!("work-group size {local_size} outside 1..={max}"),
        ));
    }
    if global_size % local_size != 0 {
        return Err(DeviceError::new(
            status::INVALID_WORK_GROUP_SIZE,
            format!("work-group size {local_size} does not divide {global_size} work-items"),
        ));
    }
    Ok(Launch {
        global_size,
        local_size,
    })
}

struct CpuBuffer {
    access: AccessMode,
    memory: DeviceMemory,
}

struct CpuKernel {
    entry_point: String,
    program: Arc<dyn HostKernel>,
    args: Vec<Option<BufferHandle>>,
}

/// CPU fallback backend: sequential reference implementation.
///
/// Always available, used for:
/// - Platforms without GPU support
/// - Correctness validation (GPU results should match CPU)
/// - Tests that need a deterministic device
///
/// Kernel "compilation" looks the entry point up in a registry of
/// [`HostKernel`]s; the diffusion kernel is registered by default.
/// Commands execute when enqueued, so [`finish`](ComputeBackend::finish)
/// only drains the pending count.
pub struct CpuFallback {
    programs: HashMap<String, Arc<dyn HostKernel>>,
    buffers: HashMap<u32, CpuBuffer>,
    kernels: HashMap<u32, CpuKernel>,
    next_handle: u32,
    max_work_group_size: usize,
    pending: usize,
}

impl CpuFallback {
    /// Creates a CPU backend with the diffusion kernel registered.
    pub fn new() -> Self {
        let mut backend = Self {
            programs: HashMap::new(),
            buffers: HashMap::new(),
            kernels: HashMap::new(),
            next_handle: 1,
            max_work_group_size: DEFAULT_MAX_WORK_GROUP_SIZE,
            pending: 0,
        };
        backend.register_kernel(DiffusionKernel::ENTRY_POINT, DiffusionKernel);
        backend
    }

    /// Overrides the reported work-group limit.
    pub fn with_max_work_group_size(mut self, max: usize) -> Self {
        self.max_work_group_size = max.max(1);
        self
    }

    /// Registers (or replaces) the kernel run for `entry_point`.
    pub fn register_kernel(&mut self, entry_point: &str, kernel: impl HostKernel + 'static) {
        self.programs.insert(entry_point.to_string(), Arc::new(kernel));
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live kernels.
    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&CpuBuffer, DeviceError> {
        self.buffers.get(&handle.0).ok_or_else(|| invalid_buffer(handle))
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Result<&mut CpuBuffer, DeviceError> {
        self.buffers.get_mut(&handle.0).ok_or_else(|| invalid_buffer(handle))
    }

    fn kernel(&self, handle: KernelHandle) -> Result<&CpuKernel, DeviceError> {
        self.kernels.get(&handle.0).ok_or_else(|| invalid_kernel(handle))
    }
}

impl Default for CpuFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuFallback {
    fn name(&self) -> &str {
        "cpu_fallback"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn compile_kernel(
        &mut self,
        _source: &str,
        entry_point: &str,
    ) -> Result<KernelHandle, DeviceError> {
        let program = self.programs.get(entry_point).cloned().ok_or_else(|| {
            DeviceError::new(
                status::INVALID_KERNEL_NAME,
                format!("no kernel named '{entry_point}'"),
            )
        })?;
        if program.output_arg() >= program.arity() {
            return Err(DeviceError::new(
                status::INVALID_ARG_INDEX,
                format!(
                    "kernel '{entry_point}' writes parameter {} but takes {}",
                    program.output_arg(),
                    program.arity()
                ),
            ));
        }
        let handle = self.allocate_handle();
        let arity = program.arity() as usize;
        self.kernels.insert(
            handle,
            CpuKernel {
                entry_point: entry_point.to_string(),
                program,
                args: vec![None; arity],
            },
        );
        tracing::debug!(entry_point, handle, "compiled host kernel");
        Ok(KernelHandle(handle))
    }

    fn create_buffer(
        &mut self,
        access: AccessMode,
        size_bytes: usize,
    ) -> Result<BufferHandle, DeviceError> {
        if size_bytes == 0 {
            return Err(DeviceError::new(
                status::INVALID_BUFFER_SIZE,
                "buffer size must be positive",
            ));
        }
        let memory = DeviceMemory::zeroed(size_bytes)?;
        let handle = self.allocate_handle();
        self.buffers.insert(handle, CpuBuffer { access, memory });
        Ok(BufferHandle(handle))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), DeviceError> {
        self.buffer_mut(buffer)?.memory.write(data)
    }

    fn read_buffer(&mut self, buffer: BufferHandle, out: &mut [u8]) -> Result<(), DeviceError> {
        self.buffer(buffer)?.memory.read(out)
    }

    fn set_kernel_arg(
        &mut self,
        kernel: KernelHandle,
        index: u32,
        buffer: BufferHandle,
    ) -> Result<(), DeviceError> {
        self.buffer(buffer)?;
        let k = self
            .kernels
            .get_mut(&kernel.0)
            .ok_or_else(|| invalid_kernel(kernel))?;
        let slot = k.args.get_mut(index as usize).ok_or_else(|| {
            DeviceError::new(
                status::INVALID_ARG_INDEX,
                format!("kernel '{}' has no parameter {index}", k.entry_point),
            )
        })?;
        *slot = Some(buffer);
        Ok(())
    }

    fn max_work_group_size(&self, kernel: KernelHandle) -> Result<usize, DeviceError> {
        self.kernel(kernel)?;
        Ok(self.max_work_group_size)
    }

    fn enqueue_kernel(
        &mut self,
        kernel: KernelHandle,
        global_size: usize,
        local_size: usize,
    ) -> Result<(), DeviceError> {
        let k = self.kernel(kernel)?;
        let launch = check_launch(global_size, local_size, self.max_work_group_size)?;

        let mut bound = Vec::with_capacity(k.args.len());
        for (index, arg) in k.args.iter().enumerate() {
            let handle = arg.ok_or_else(|| {
                DeviceError::new(
                    status::INVALID_KERNEL_ARGS,
                    format!("parameter {index} of '{}' is not set", k.entry_point),
                )
            })?;
            bound.push(handle);
        }

        let output_index = k.program.output_arg() as usize;
        let output = *bound.get(output_index).ok_or_else(|| {
            DeviceError::new(
                status::INVALID_ARG_INDEX,
                format!("kernel '{}' has no parameter {output_index}", k.entry_point),
            )
        })?;
        let program = Arc::clone(&k.program);

        if !self.buffer(output)?.access.kernel_writable() {
            return Err(DeviceError::new(
                status::INVALID_KERNEL_ARGS,
                format!("output parameter {output_index} is bound to a read-only buffer"),
            ));
        }
        for (index, handle) in bound.iter().enumerate() {
            if index == output_index {
                continue;
            }
            if *handle == output {
                return Err(DeviceError::new(
                    status::INVALID_KERNEL_ARGS,
                    format!("parameter {index} aliases the output buffer"),
                ));
            }
            if !self.buffer(*handle)?.access.kernel_readable() {
                return Err(DeviceError::new(
                    status::INVALID_KERNEL_ARGS,
                    format!("parameter {index} is bound to a write-only buffer"),
                ));
            }
        }

        // Detach the output so the inputs can be borrowed alongside it.
        let mut out_memory = std::mem::replace(
            &mut self.buffer_mut(output)?.memory,
            DeviceMemory::zeroed(0)?,
        );
        let inputs: Vec<&[u8]> = bound
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != output_index)
            .map(|(_, handle)| self.buffers[&handle.0].memory.as_bytes())
            .collect();
        let result = program.execute(launch, &inputs, out_memory.as_bytes_mut());
        self.buffer_mut(output)?.memory = out_memory;
        result?;

        self.pending += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        self.pending = 0;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.buffers
            .remove(&buffer.0)
            .map(|_| ())
            .ok_or_else(|| invalid_buffer(buffer))
    }

    fn release_kernel(&mut self, kernel: KernelHandle) -> Result<(), DeviceError> {
        self.kernels
            .remove(&kernel.0)
            .map(|_| ())
            .ok_or_else(|| invalid_kernel(kernel))
    }
}

impl Drop for CpuFallback {
    fn drop(&mut self) {
        tracing::debug!(
            buffers = self.buffers.len(),
            kernels = self.kernels.len(),
            pending = self.pending,
            "releasing cpu_fallback context"
        );
    }
}

fn invalid_buffer(handle: BufferHandle) -> DeviceError {
    DeviceError::new(
        status::INVALID_MEM_OBJECT,
        format!("buffer {} is not a live buffer", handle.0),
    )
}

fn invalid_kernel(handle: KernelHandle) -> DeviceError {
    DeviceError::new(
        status::INVALID_KERNEL,
        format!("kernel {} is not a live kernel", handle.0),
    )
}
