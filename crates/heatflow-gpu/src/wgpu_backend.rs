//! GPU compute via wgpu.
//!
//! Buffers are storage buffers sized to the next multiple of four bytes
//! (wgpu's copy alignment). Kernels are WGSL compute entry points whose
//! work-group size is the pipeline-overridable constant `group_size`;
//! one pipeline is built per distinct work-group size and cached.

use std::collections::HashMap;

use heatflow_types::DeviceError;

use crate::backend::{check_launch, ComputeBackend};
use crate::buffers::{AccessMode, BufferHandle};
use crate::kernel::KernelHandle;
use crate::status;

/// Name of the WGSL override constant holding the work-group size.
const GROUP_SIZE_OVERRIDE: &str = "group_size";

struct GpuBuffer {
    buffer: wgpu::Buffer,
    /// Requested size; `buffer.size()` may be padded.
    len: usize,
}

struct GpuKernel {
    entry_point: String,
    module: wgpu::ShaderModule,
    pipelines: HashMap<usize, wgpu::ComputePipeline>,
    args: Vec<Option<BufferHandle>>,
}

/// Compute backend running kernels on the first available GPU adapter.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    buffers: HashMap<u32, GpuBuffer>,
    kernels: HashMap<u32, GpuKernel>,
    next_handle: u32,
    arg_count: usize,
}

impl WgpuBackend {
    /// Requests a high-performance adapter and opens a device on it.
    ///
    /// `arg_count` is the number of storage bindings kernels use (group 0,
    /// bindings `0..arg_count`).
    pub fn new(arg_count: usize) -> Result<Self, DeviceError> {
        pollster::block_on(Self::new_async(arg_count))
    }

    async fn new_async(arg_count: usize) -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| DeviceError::new(status::DEVICE_NOT_FOUND, "no GPU adapter available"))?;

        let adapter_name = adapter.get_info().name;
        tracing::info!(adapter = %adapter_name, "using GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("heatflow"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::new(status::DEVICE_NOT_FOUND, e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter_name,
            buffers: HashMap::new(),
            kernels: HashMap::new(),
            next_handle: 1,
            arg_count,
        })
    }

    /// Name of the adapter the device was opened on.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&GpuBuffer, DeviceError> {
        self.buffers.get(&handle.0).ok_or_else(|| {
            DeviceError::new(
                status::INVALID_MEM_OBJECT,
                format!("buffer {} is not a live buffer", handle.0),
            )
        })
    }

    fn kernel_ref(&self, handle: KernelHandle) -> Result<&GpuKernel, DeviceError> {
        self.kernels.get(&handle.0).ok_or_else(|| invalid_kernel(handle))
    }

    /// Runs `f` inside a validation error scope and reports any error as `code`.
    fn scoped<T>(&self, code: i32, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, DeviceError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(value),
            Some(err) => Err(DeviceError::new(code, err.to_string())),
        }
    }

    fn build_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        entry_point: &str,
        group_size: usize,
    ) -> wgpu::ComputePipeline {
        let constants = HashMap::from([(GROUP_SIZE_OVERRIDE.to_string(), group_size as f64)]);
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(entry_point),
            layout: None,
            module,
            entry_point,
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
        })
    }

    fn max_group_size(&self) -> usize {
        let limits = self.device.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x) as usize
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn compile_kernel(
        &mut self,
        source: &str,
        entry_point: &str,
    ) -> Result<KernelHandle, DeviceError> {
        let module = self.scoped(status::BUILD_PROGRAM_FAILURE, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(entry_point),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        // Building once with a group size of one validates the entry point.
        let pipeline = self.scoped(status::INVALID_KERNEL_NAME, |device| {
            Self::build_pipeline(device, &module, entry_point, 1)
        })?;

        let handle = self.allocate_handle();
        self.kernels.insert(
            handle,
            GpuKernel {
                entry_point: entry_point.to_string(),
                module,
                pipelines: HashMap::from([(1, pipeline)]),
                args: vec![None; self.arg_count],
            },
        );
        Ok(KernelHandle(handle))
    }

    fn create_buffer(
        &mut self,
        _access: AccessMode,
        size_bytes: usize,
    ) -> Result<BufferHandle, DeviceError> {
        if size_bytes == 0 {
            return Err(DeviceError::new(
                status::INVALID_BUFFER_SIZE,
                "buffer size must be positive",
            ));
        }
        let padded = padded_len(size_bytes) as u64;
        if padded > self.device.limits().max_storage_buffer_binding_size as u64 {
            return Err(DeviceError::new(
                status::INVALID_BUFFER_SIZE,
                format!("{size_bytes} bytes exceed the storage binding limit"),
            ));
        }
        // Access is enforced by the shader's `read`/`read_write` declarations.
        let buffer = self.scoped(status::OUT_OF_RESOURCES, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: None,
                size: padded,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })?;
        let handle = self.allocate_handle();
        self.buffers.insert(
            handle,
            GpuBuffer {
                buffer,
                len: size_bytes,
            },
        );
        Ok(BufferHandle(handle))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), DeviceError> {
        let target = self.buffer(buffer)?;
        if data.len() > target.len {
            return Err(DeviceError::new(
                status::INVALID_VALUE,
                format!("write of {} bytes into {}-byte buffer", data.len(), target.len),
            ));
        }
        let mut padded = data.to_vec();
        padded.resize(padded_len(data.len()), 0);
        self.queue.write_buffer(&target.buffer, 0, &padded);
        self.queue.submit(None);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle, out: &mut [u8]) -> Result<(), DeviceError> {
        let source = self.buffer(buffer)?;
        if out.len() > source.len {
            return Err(DeviceError::new(
                status::INVALID_VALUE,
                format!("read of {} bytes from {}-byte buffer", out.len(), source.len),
            ));
        }
        if out.is_empty() {
            return Ok(());
        }
        let size = padded_len(out.len()) as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| DeviceError::new(status::OUT_OF_RESOURCES, e.to_string()))?
            .map_err(|e| DeviceError::new(status::OUT_OF_RESOURCES, e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(&data[..out.len()]);
        }
        staging.unmap();
        Ok(())
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
        self.kernel_ref(kernel)?;
        Ok(self.max_group_size())
    }

    fn enqueue_kernel(
        &mut self,
        kernel: KernelHandle,
        global_size: usize,
        local_size: usize,
    ) -> Result<(), DeviceError> {
        let launch = check_launch(global_size, local_size, self.max_group_size())?;
        let groups = u32::try_from(launch.group_count()).map_err(|_| {
            DeviceError::new(
                status::INVALID_GLOBAL_WORK_SIZE,
                format!("{} work-groups exceed the dispatch limit", launch.group_count()),
            )
        })?;

        if !self.kernel_ref(kernel)?.pipelines.contains_key(&local_size) {
            let k = self.kernel_ref(kernel)?;
            let pipeline = self.scoped(status::INVALID_WORK_GROUP_SIZE, |device| {
                Self::build_pipeline(device, &k.module, &k.entry_point, local_size)
            })?;
            if let Some(k) = self.kernels.get_mut(&kernel.0) {
                k.pipelines.insert(local_size, pipeline);
            }
        }

        let k = self.kernel_ref(kernel)?;
        let mut entries = Vec::with_capacity(k.args.len());
        for (index, arg) in k.args.iter().enumerate() {
            let handle = arg.ok_or_else(|| {
                DeviceError::new(
                    status::INVALID_KERNEL_ARGS,
                    format!("parameter {index} of '{}' is not set", k.entry_point),
                )
            })?;
            entries.push(wgpu::BindGroupEntry {
                binding: index as u32,
                resource: self.buffer(handle)?.buffer.as_entire_binding(),
            });
        }
        let pipeline = &k.pipelines[&local_size];

        let bind_group = self.scoped(status::INVALID_KERNEL_ARGS, |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &pipeline.get_bind_group_layout(0),
                entries: &entries,
            })
        })?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(k.entry_point.as_str()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        let _ = self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        let released = self.buffers.remove(&buffer.0).ok_or_else(|| {
            DeviceError::new(
                status::INVALID_MEM_OBJECT,
                format!("buffer {} is not a live buffer", buffer.0),
            )
        })?;
        released.buffer.destroy();
        Ok(())
    }

    fn release_kernel(&mut self, kernel: KernelHandle) -> Result<(), DeviceError> {
        self.kernels
            .remove(&kernel.0)
            .map(|_| ())
            .ok_or_else(|| invalid_kernel(kernel))
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        for (_, b) in self.buffers.drain() {
            b.buffer.destroy();
        }
        tracing::debug!(adapter = %self.adapter_name, "releasing wgpu context");
    }
}

fn padded_len(len: usize) -> usize {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    len.div_ceil(align) * align
}

fn invalid_kernel(handle: KernelHandle) -> DeviceError {
    DeviceError::new(
        status::INVALID_KERNEL,
        format!("kernel {} is not a live kernel", handle.0),
    )
}
