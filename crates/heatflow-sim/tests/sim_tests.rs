//! Integration tests for heatflow-sim.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use heatflow_gpu::buffers::{AccessMode, BufferHandle};
use heatflow_gpu::kernel::{HostKernel, KernelHandle, Launch};
use heatflow_gpu::{status, ComputeBackend, CpuFallback};
use heatflow_grid::{CellType, Dimensions, Grid};
use heatflow_render::TerminalRenderer;
use heatflow_sim::config::{BackendKind, HeatflowConfig, SimulationConfig, SimulationSettings};
use heatflow_sim::context::SimulationContext;
use heatflow_sim::driver::SimulationDriver;
use heatflow_telemetry::{EventKind, VecSink};
use heatflow_types::constants::DIFFUSION_ENTRY_POINT;
use heatflow_types::{DeviceError, HeatflowError};

/// Diffusion stand-in that copies `current` into `next`.
struct IdentityKernel;

impl HostKernel for IdentityKernel {
    fn arity(&self) -> u32 {
        4
    }

    fn output_arg(&self) -> u32 {
        3
    }

    fn execute(&self, _launch: Launch, inputs: &[&[u8]], output: &mut [u8]) -> Result<(), DeviceError> {
        output.copy_from_slice(&inputs[0][..output.len()]);
        Ok(())
    }
}

fn identity_backend() -> CpuFallback {
    let mut backend = CpuFallback::new();
    backend.register_kernel(DIFFUSION_ENTRY_POINT, IdentityKernel);
    backend
}

/// Delegates to a CPU backend while counting live device resources.
struct CountingBackend {
    inner: CpuFallback,
    live: Arc<AtomicUsize>,
    /// Fail `create_buffer` once this many buffers exist.
    buffer_limit: usize,
}

impl CountingBackend {
    fn new(inner: CpuFallback, live: Arc<AtomicUsize>) -> Self {
        Self { inner, live, buffer_limit: usize::MAX }
    }
}

impl ComputeBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn compile_kernel(&mut self, source: &str, entry_point: &str) -> Result<KernelHandle, DeviceError> {
        let k = self.inner.compile_kernel(source, entry_point)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(k)
    }

    fn create_buffer(&mut self, access: AccessMode, size_bytes: usize) -> Result<BufferHandle, DeviceError> {
        if self.inner.buffer_count() >= self.buffer_limit {
            return Err(DeviceError::new(status::OUT_OF_RESOURCES, "buffer limit reached"));
        }
        let b = self.inner.create_buffer(access, size_bytes)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(b)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), DeviceError> {
        self.inner.write_buffer(buffer, data)
    }

    fn read_buffer(&mut self, buffer: BufferHandle, out: &mut [u8]) -> Result<(), DeviceError> {
        self.inner.read_buffer(buffer, out)
    }

    fn set_kernel_arg(&mut self, kernel: KernelHandle, index: u32, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.inner.set_kernel_arg(kernel, index, buffer)
    }

    fn max_work_group_size(&self, kernel: KernelHandle) -> Result<usize, DeviceError> {
        self.inner.max_work_group_size(kernel)
    }

    fn enqueue_kernel(&mut self, kernel: KernelHandle, global_size: usize, local_size: usize) -> Result<(), DeviceError> {
        self.inner.enqueue_kernel(kernel, global_size, local_size)
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        self.inner.finish()
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), DeviceError> {
        self.inner.release_buffer(buffer)?;
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_kernel(&mut self, kernel: KernelHandle) -> Result<(), DeviceError> {
        self.inner.release_kernel(kernel)?;
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn grid_2x2() -> Grid {
    let dims = Dimensions::new(2, 2).unwrap();
    Grid::new(dims, vec![CellType::FLUID; 4], vec![10.0, 0.0, -10.0, 0.0]).unwrap()
}

fn config(iterations: u32) -> SimulationConfig {
    SimulationConfig {
        iterations,
        decay_rate: 0.02,
        work_items: 4,
        work_group_size: 2,
        upload_next: true,
    }
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
    }
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn default_config() {
    let config = SimulationConfig::default();
    assert!((config.decay_rate - 0.02).abs() < 1e-12);
    assert!(config.upload_next);
    assert!(config.validate().is_ok());
}

#[test]
fn decay_rate_range() {
    for rate in [-0.1, 1.0, 1.5, f64::NAN, f64::INFINITY] {
        let config = SimulationConfig { decay_rate: rate, ..config(1) };
        assert!(matches!(config.validate(), Err(HeatflowError::InvalidConfig(_))), "{rate}");
    }
    let config = SimulationConfig { decay_rate: 0.0, ..config(1) };
    assert!(config.validate().is_ok());
}

#[test]
fn zero_launch_sizes_rejected() {
    assert!(SimulationConfig { work_items: 0, ..config(1) }.validate().is_err());
    assert!(SimulationConfig { work_group_size: 0, ..config(1) }.validate().is_err());
}

#[test]
fn toml_partial_tables() {
    let config = HeatflowConfig::from_toml_str(
        "[simulation]\ndecay_rate = 0.1\nupload_next = false\n\n[render]\nenabled = true\nframe_delay_ms = 50\n",
    )
    .unwrap();
    assert!((config.simulation.decay_rate - 0.1).abs() < 1e-12);
    assert!(!config.simulation.upload_next);
    assert!(config.render.enabled);
    assert_eq!(config.render.frame_delay_ms, 50);

    let empty = HeatflowConfig::from_toml_str("").unwrap();
    assert_eq!(empty, HeatflowConfig::default());
}

#[test]
fn toml_unknown_key_rejected() {
    let err = HeatflowConfig::from_toml_str("[simulation]\ndecay = 0.1\n").unwrap_err();
    assert!(matches!(err, HeatflowError::InvalidConfig(_)));
}

#[test]
fn toml_rejects_per_run_keys() {
    for key in ["iterations = 5", "work_items = 8", "work_group_size = 4"] {
        let text = format!("[simulation]\ndecay_rate = 0.1\n{key}\n");
        let err = HeatflowConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, HeatflowError::InvalidConfig(_)), "{key}");
    }
}

#[test]
fn settings_fill_simulation_config() {
    let settings = SimulationSettings { decay_rate: 0.25, upload_next: false };
    let config = SimulationConfig::from_settings(&settings, 7, 16, 4);
    assert_eq!(
        config,
        SimulationConfig {
            iterations: 7,
            decay_rate: 0.25,
            work_items: 16,
            work_group_size: 4,
            upload_next: false,
        }
    );
    assert_eq!(SimulationSettings::default().decay_rate, SimulationConfig::default().decay_rate);
}

#[test]
fn settings_serialization() {
    let settings = SimulationSettings { decay_rate: 0.5, upload_next: false };
    let json = serde_json::to_string(&settings).unwrap();
    let recovered: SimulationSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, settings);
}

#[test]
fn cpu_backend_kind() {
    let backend = BackendKind::Cpu.create().unwrap();
    assert_eq!(backend.name(), "cpu_fallback");
    assert_eq!(BackendKind::default(), BackendKind::Cpu);
    assert_eq!(BackendKind::Wgpu.name(), "wgpu");
}

// ─── Context Tests ────────────────────────────────────────────

#[test]
fn context_allocates_four_buffers_and_releases_on_drop() {
    let live = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend::new(CpuFallback::new(), live.clone());
    let ctx = SimulationContext::new(grid_2x2(), Box::new(backend)).unwrap();
    assert_eq!(live.load(Ordering::SeqCst), 5);
    assert_eq!(ctx.backend_name(), "counting");

    let grid = ctx.into_grid();
    assert_eq!(live.load(Ordering::SeqCst), 0);
    assert_eq!(grid.current(), &[10.0, 0.0, -10.0, 0.0]);
}

#[test]
fn partial_context_is_released_on_error() {
    let live = Arc::new(AtomicUsize::new(0));
    let mut backend = CountingBackend::new(CpuFallback::new(), live.clone());
    backend.buffer_limit = 2;
    let err = SimulationContext::new(grid_2x2(), Box::new(backend)).err().unwrap();
    match err {
        HeatflowError::Backend { call, file, source, .. } => {
            assert_eq!(call, "create_buffer");
            assert!(file.ends_with("context.rs"), "{file}");
            assert_eq!(source.code, status::OUT_OF_RESOURCES);
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

// ─── Protocol Tests ───────────────────────────────────────────

#[test]
fn two_by_two_identity_scenario() {
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    let mut driver = SimulationDriver::new(config(1)).unwrap();
    let summary = driver.run(&mut ctx).unwrap();

    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.group_size, Some(2));
    assert_close(ctx.grid().next(), &[10.0, 0.0, -10.0, 0.0]);
    assert_close(ctx.grid().current(), &[9.8, 0.0, -9.8, 0.0]);
    assert!((summary.final_range.0 + 9.8).abs() < 1e-12);
    assert!((summary.final_range.1 - 9.8).abs() < 1e-12);
}

#[test]
fn zero_iterations_keep_loaded_temperatures() {
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(CpuFallback::new())).unwrap();
    let mut driver = SimulationDriver::new(config(0)).unwrap();
    let summary = driver.run(&mut ctx).unwrap();

    assert_eq!(summary.iterations, 0);
    assert_eq!(summary.group_size, None);
    assert_eq!(ctx.grid().next(), &[10.0, 0.0, -10.0, 0.0]);
    assert_eq!(ctx.grid().current(), &[10.0, 0.0, -10.0, 0.0]);
}

#[test]
fn advance_is_idempotent_under_identity_kernel() {
    let no_decay = SimulationConfig { decay_rate: 0.0, ..config(1) };
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    for _ in 0..3 {
        ctx.step(&no_decay).unwrap();
        assert_close(ctx.grid().current(), &[10.0, 0.0, -10.0, 0.0]);
        assert_close(ctx.grid().next(), &[10.0, 0.0, -10.0, 0.0]);
    }
}

#[test]
fn decay_compounds_per_iteration() {
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    SimulationDriver::new(config(3)).unwrap().run(&mut ctx).unwrap();
    let expected = 10.0 * 0.98f64.powi(3);
    assert!((ctx.grid().current()[0] - expected).abs() < 1e-12);
    // `next` holds the value before the last decay.
    assert!((ctx.grid().next()[0] - 10.0 * 0.98f64.powi(2)).abs() < 1e-12);
}

#[test]
fn skipping_next_upload_gives_same_result() {
    let mut with = SimulationContext::new(grid_2x2(), Box::new(CpuFallback::new())).unwrap();
    let mut without = SimulationContext::new(grid_2x2(), Box::new(CpuFallback::new())).unwrap();
    SimulationDriver::new(config(4)).unwrap().run(&mut with).unwrap();
    SimulationDriver::new(SimulationConfig { upload_next: false, ..config(4) })
        .unwrap()
        .run(&mut without)
        .unwrap();
    assert_eq!(with.grid().current(), without.grid().current());
}

#[test]
fn diffusion_spreads_heat() {
    let dims = Dimensions::new(1, 3).unwrap();
    let grid = Grid::new(dims, vec![CellType::FLUID; 3], vec![30.0, 0.0, 0.0]).unwrap();
    let mut ctx = SimulationContext::new(grid, Box::new(CpuFallback::new())).unwrap();
    let config = SimulationConfig { decay_rate: 0.0, work_items: 3, work_group_size: 1, ..config(1) };
    ctx.step(&config).unwrap();
    assert_close(ctx.grid().current(), &[15.0, 10.0, 0.0]);
}

#[test]
fn group_size_is_clamped_to_device_limit() {
    let backend = identity_backend().with_max_work_group_size(2);
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(backend)).unwrap();
    let config = SimulationConfig { work_items: 8, work_group_size: 64, ..config(1) };
    assert_eq!(ctx.step(&config).unwrap(), 2);

    let config = SimulationConfig { work_items: 8, work_group_size: 1, ..config };
    assert_eq!(ctx.step(&config).unwrap(), 1);
}

#[test]
fn backend_error_carries_driver_call_site() {
    let backend = identity_backend().with_max_work_group_size(4);
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(backend)).unwrap();
    // 4 does not divide 10 work-items.
    let config = SimulationConfig { work_items: 10, work_group_size: 4, ..config(1) };
    let err = SimulationDriver::new(config).unwrap().run(&mut ctx).unwrap_err();

    assert_eq!(err.exit_code(), 5);
    match &err {
        HeatflowError::Backend { call, file, line, source } => {
            assert_eq!(*call, "enqueue_kernel");
            assert!(file.ends_with("driver.rs"), "{file}");
            assert!(*line > 0);
            assert_eq!(source.code, status::INVALID_WORK_GROUP_SIZE);
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert!(err.to_string().contains("driver.rs"));
}

#[test]
fn resources_released_after_failed_run() {
    let live = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend::new(identity_backend().with_max_work_group_size(4), live.clone());
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(backend)).unwrap();
    let config = SimulationConfig { work_items: 10, work_group_size: 4, ..config(1) };
    assert!(SimulationDriver::new(config).unwrap().run(&mut ctx).is_err());
    drop(ctx);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

// ─── Driver Tests ─────────────────────────────────────────────

#[test]
fn invalid_config_rejected_by_driver() {
    let config = SimulationConfig { decay_rate: 2.0, ..config(1) };
    assert!(SimulationDriver::new(config).is_err());
}

#[test]
fn driver_emits_events_in_order() {
    let sink = VecSink::new();
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    let mut driver = SimulationDriver::new(config(2))
        .unwrap()
        .with_sink(Box::new(sink.clone()));
    driver.run(&mut ctx).unwrap();

    let labels: Vec<String> = sink.events().iter().map(|e| e.label().to_string()).collect();
    assert_eq!(
        labels,
        [
            "run_begin",
            "iteration_begin",
            "dispatch",
            "iteration_end",
            "iteration_begin",
            "dispatch",
            "iteration_end",
            "run_end",
        ]
    );
    let events = sink.events();
    assert_eq!(
        events[2].kind,
        EventKind::Dispatch { work_items: 4, group_size: 2 }
    );
    assert_eq!(events[4].iteration, 1);
}

#[test]
fn renderer_sees_initial_frame_plus_one_per_iteration() {
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    let mut driver = SimulationDriver::new(config(3)).unwrap();
    driver.run(&mut ctx).unwrap();
    assert_eq!(driver.renderer().name(), "headless");
    assert_eq!(driver.renderer().frame_count(), 4);
}

#[test]
fn terminal_renderer_runs_in_driver() {
    let mut ctx = SimulationContext::new(grid_2x2(), Box::new(identity_backend())).unwrap();
    let mut driver = SimulationDriver::new(config(2))
        .unwrap()
        .with_renderer(Box::new(TerminalRenderer::new(Vec::new())));
    driver.run(&mut ctx).unwrap();
    assert_eq!(driver.renderer().frame_count(), 3);
}
