//! CLI command implementation.

use std::time::Duration;

use heatflow_io::{load_grid, store_grid, validate_input};
use heatflow_render::TerminalRenderer;
use heatflow_sim::{BackendKind, HeatflowConfig, SimulationConfig, SimulationContext, SimulationDriver};
use heatflow_telemetry::TracingSink;
use heatflow_types::HeatflowResult;

use crate::Cli;

/// Load, simulate, store.
pub fn simulate(cli: &Cli) -> HeatflowResult<()> {
    let file_config = match &cli.config {
        Some(path) => HeatflowConfig::load(path)?,
        None => HeatflowConfig::default(),
    };

    let input = load_grid(&cli.input)?;
    validate_input(&input)?;

    let mut config = SimulationConfig::from_settings(
        &file_config.simulation,
        input.iterations,
        cli.work_items,
        cli.work_group_size,
    );
    if let Some(rate) = cli.decay_rate {
        config.decay_rate = rate;
    }
    config.upload_next &= !cli.skip_next_upload;

    // Validates the config before any device resource exists.
    let mut driver = SimulationDriver::new(config)?.with_sink(Box::new(TracingSink::new()));
    if cli.render || file_config.render.enabled {
        let delay = Duration::from_millis(file_config.render.frame_delay_ms);
        driver = driver.with_renderer(Box::new(
            TerminalRenderer::new(std::io::stdout()).with_frame_delay(delay),
        ));
    }

    let backend_kind = BackendKind::from(cli.backend);
    let backend = backend_kind.create()?;
    let mut ctx = SimulationContext::new(input.grid, backend)?;

    let summary = driver.run(&mut ctx)?;
    tracing::info!(
        iterations = summary.iterations,
        group_size = ?summary.group_size,
        wall_time = summary.wall_time,
        "simulation finished"
    );

    store_grid(&cli.output, ctx.grid())
}
