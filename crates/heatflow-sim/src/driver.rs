//! Simulation driver: the iteration loop and the per-step device protocol.
//!
//! Each iteration runs, in this order:
//!
//! ```text
//! 1. upload current, next (optional), cell types, dimensions
//! 2. bind (current, cell types, dimensions, next) to parameters 0..4
//! 3. effective = min(requested group size, kernel limit)
//! 4. enqueue over work_items in groups of effective; finish
//! 5. download next
//! 6. grid.advance(); grid.decay(rate)
//! ```
//!
//! Any failing backend call aborts the run with the call name and the
//! line of this file that issued it.

use std::time::Instant;

use heatflow_render::{HeadlessRenderer, RenderFrame, Renderer};
use heatflow_telemetry::{EventBus, EventKind, EventSink, SimulationEvent};
use heatflow_types::{DeviceResultExt, HeatflowResult, Scalar};

use crate::config::SimulationConfig;
use crate::context::SimulationContext;

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Iterations executed.
    pub iterations: u32,
    /// Work-group size of the last dispatch, after clamping.
    /// `None` when no iteration ran.
    pub group_size: Option<usize>,
    /// Wall-clock time of the iteration loop (seconds).
    pub wall_time: f64,
    /// `(min, max)` of `current` after the last decay.
    pub final_range: (Scalar, Scalar),
}

impl SimulationContext {
    /// Runs one iteration of the device protocol.
    ///
    /// Returns the effective work-group size used for the dispatch.
    pub fn step(&mut self, config: &SimulationConfig) -> HeatflowResult<usize> {
        let backend = &mut self.device.backend;
        let buffers = self.buffers;
        let kernel = self.kernel;
        let grid = &mut self.grid;

        // 1. Host to device.
        backend
            .write_buffer(buffers.current, bytemuck::cast_slice(grid.current()))
            .on_device("write_buffer(current)")?;
        if config.upload_next {
            backend
                .write_buffer(buffers.next, bytemuck::cast_slice(grid.next()))
                .on_device("write_buffer(next)")?;
        }
        backend
            .write_buffer(buffers.cell_types, bytemuck::cast_slice(grid.cell_types()))
            .on_device("write_buffer(cell_types)")?;
        let dims = grid.dimensions().to_device();
        backend
            .write_buffer(buffers.dimensions, bytemuck::cast_slice(&dims))
            .on_device("write_buffer(dimensions)")?;

        // 2. Bind parameters.
        for (index, buffer) in (0u32..).zip(buffers.in_order()) {
            backend
                .set_kernel_arg(kernel, index, buffer)
                .on_device("set_kernel_arg")?;
        }

        // 3. Clamp the group size.
        let max = backend
            .max_work_group_size(kernel)
            .on_device("max_work_group_size")?;
        let effective = config.work_group_size.min(max);
        if effective < config.work_group_size {
            tracing::trace!(requested = config.work_group_size, max, "clamped work-group size");
        }

        // 4. Dispatch and wait.
        backend
            .enqueue_kernel(kernel, config.work_items, effective)
            .on_device("enqueue_kernel")?;
        backend.finish().on_device("finish")?;

        // 5. Device to host.
        backend
            .read_buffer(buffers.next, bytemuck::cast_slice_mut(grid.next_mut()))
            .on_device("read_buffer(next)")?;

        // 6. Host update.
        grid.advance();
        grid.decay(config.decay_rate);

        Ok(effective)
    }
}

/// Runs the iteration loop, emitting telemetry and render frames.
pub struct SimulationDriver {
    config: SimulationConfig,
    bus: EventBus,
    renderer: Box<dyn Renderer>,
}

impl SimulationDriver {
    /// Creates a driver with a headless renderer and no telemetry sinks.
    pub fn new(config: SimulationConfig) -> HeatflowResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bus: EventBus::new(),
            renderer: Box::new(HeadlessRenderer::new()),
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.bus.add_sink(sink);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Runs `config.iterations` iterations on `ctx`.
    ///
    /// The renderer and telemetry sinks are finalized whether or not
    /// the run succeeds.
    pub fn run(&mut self, ctx: &mut SimulationContext) -> HeatflowResult<RunSummary> {
        let result = self.run_iterations(ctx);
        let finalized = self.renderer.finalize();
        let events = self.bus.finalize();
        tracing::debug!(events, "telemetry finalized");
        let summary = result?;
        finalized?;
        Ok(summary)
    }

    fn run_iterations(&mut self, ctx: &mut SimulationContext) -> HeatflowResult<RunSummary> {
        let config = &self.config;
        let dims = ctx.grid().dimensions().to_device();

        tracing::info!(
            backend = ctx.backend_name(),
            width = dims[0],
            height = dims[1],
            iterations = config.iterations,
            work_items = config.work_items,
            work_group_size = config.work_group_size,
            decay_rate = config.decay_rate,
            "starting run"
        );
        self.bus.emit(SimulationEvent::new(
            0,
            EventKind::RunBegin {
                width: dims[0],
                height: dims[1],
                iterations: config.iterations,
                backend: ctx.backend_name().to_string(),
            },
        ));

        self.renderer.init(ctx.grid())?;
        self.renderer.submit_frame(&RenderFrame::new(0, ctx.grid()))?;

        let start = Instant::now();
        let mut group_size = None;
        for iteration in 0..config.iterations {
            let iteration_start = Instant::now();
            self.bus
                .emit(SimulationEvent::new(iteration, EventKind::IterationBegin));

            let effective = ctx.step(config)?;
            group_size = Some(effective);
            self.bus.emit(SimulationEvent::new(
                iteration,
                EventKind::Dispatch {
                    work_items: config.work_items as u32,
                    group_size: effective as u32,
                },
            ));

            self.renderer
                .submit_frame(&RenderFrame::new(iteration + 1, ctx.grid()))?;

            let wall_time = iteration_start.elapsed().as_secs_f64();
            self.bus.emit(SimulationEvent::new(
                iteration,
                EventKind::IterationEnd { wall_time },
            ));
            let events = self.bus.flush();
            tracing::debug!(
                iteration,
                group_size = effective,
                wall_time,
                events,
                "iteration complete"
            );
        }

        let wall_time = start.elapsed().as_secs_f64();
        let final_range = ctx.grid().temperature_range();
        self.bus.emit(SimulationEvent::new(
            config.iterations,
            EventKind::RunEnd {
                wall_time,
                min_temperature: final_range.0,
                max_temperature: final_range.1,
            },
        ));
        tracing::info!(
            iterations = config.iterations,
            wall_time,
            min = final_range.0,
            max = final_range.1,
            "run complete"
        );

        Ok(RunSummary {
            iterations: config.iterations,
            group_size,
            wall_time,
            final_range,
        })
    }
}
