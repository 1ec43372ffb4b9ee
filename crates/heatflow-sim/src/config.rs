//! Simulation configuration.
//!
//! Parameters that control a run: iteration count, decay rate, launch
//! geometry, backend choice, and display settings. The `[simulation]`
//! and `[render]` tables of a TOML file map onto [`HeatflowConfig`].
//!
//! The iteration count comes from the input file and the launch geometry
//! from the command line, so a config file cannot set either.

use std::path::Path;

use serde::{Deserialize, Serialize};

use heatflow_gpu::ComputeBackend;
use heatflow_types::constants::DEFAULT_DECAY_RATE;
use heatflow_types::{HeatflowError, HeatflowResult, Scalar};

/// Configuration for the simulation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of iterations. Normally taken from the input file.
    pub iterations: u32,

    /// Fraction of each temperature removed after every iteration, in `[0, 1)`.
    pub decay_rate: Scalar,

    /// Global work-item count per dispatch.
    pub work_items: usize,

    /// Requested work-group size. Clamped to the kernel's device limit.
    pub work_group_size: usize,

    /// Upload the host `next` buffer every iteration along with `current`.
    /// The kernel overwrites every cell of `next`, so skipping it only
    /// saves a transfer.
    pub upload_next: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 0,
            decay_rate: DEFAULT_DECAY_RATE,
            work_items: 1,
            work_group_size: 1,
            upload_next: true,
        }
    }
}

impl SimulationConfig {
    /// Combines file settings with the per-run values that only the input
    /// file and the command line provide.
    pub fn from_settings(
        settings: &SimulationSettings,
        iterations: u32,
        work_items: usize,
        work_group_size: usize,
    ) -> Self {
        Self {
            iterations,
            decay_rate: settings.decay_rate,
            work_items,
            work_group_size,
            upload_next: settings.upload_next,
        }
    }

    /// Checks ranges before any device resource is created.
    pub fn validate(&self) -> HeatflowResult<()> {
        if !self.decay_rate.is_finite() || !(0.0..1.0).contains(&self.decay_rate) {
            return Err(HeatflowError::InvalidConfig(format!(
                "decay rate must be in [0, 1), got {}",
                self.decay_rate
            )));
        }
        if self.work_items == 0 {
            return Err(HeatflowError::InvalidConfig(
                "work item count must be positive".into(),
            ));
        }
        if u32::try_from(self.work_items).is_err() {
            return Err(HeatflowError::InvalidConfig(format!(
                "work item count {} exceeds {}",
                self.work_items,
                u32::MAX
            )));
        }
        if self.work_group_size == 0 {
            return Err(HeatflowError::InvalidConfig(
                "work group size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The `[simulation]` table of a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    pub decay_rate: Scalar,
    pub upload_next: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            decay_rate: defaults.decay_rate,
            upload_next: defaults.upload_next,
        }
    }
}

/// Display settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Draw the grid in the terminal after every iteration.
    pub enabled: bool,
    /// Pause after each frame (milliseconds).
    pub frame_delay_ms: u64,
}

/// Root of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatflowConfig {
    pub simulation: SimulationSettings,
    pub render: RenderConfig,
}

impl HeatflowConfig {
    /// Parses TOML text. Missing tables and keys take their defaults.
    pub fn from_toml_str(text: &str) -> HeatflowResult<Self> {
        toml::from_str(text).map_err(|e| HeatflowError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> HeatflowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HeatflowError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }
}

/// Compute backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Sequential host reference backend.
    #[default]
    Cpu,
    /// GPU compute through wgpu. Requires the `wgpu` feature.
    Wgpu,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Cpu => "cpu",
            BackendKind::Wgpu => "wgpu",
        }
    }

    /// Initializes the selected backend.
    pub fn create(self) -> HeatflowResult<Box<dyn ComputeBackend>> {
        match self {
            BackendKind::Cpu => Ok(Box::new(heatflow_gpu::CpuFallback::new())),
            BackendKind::Wgpu => create_wgpu(),
        }
    }
}

#[cfg(feature = "wgpu")]
fn create_wgpu() -> HeatflowResult<Box<dyn ComputeBackend>> {
    use heatflow_types::constants::KERNEL_ARG_COUNT;
    use heatflow_types::DeviceResultExt;

    let backend = heatflow_gpu::WgpuBackend::new(KERNEL_ARG_COUNT as usize).on_device("init_backend")?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "wgpu"))]
fn create_wgpu() -> HeatflowResult<Box<dyn ComputeBackend>> {
    Err(HeatflowError::InvalidConfig(
        "the wgpu backend is not compiled in (enable the `wgpu` feature)".into(),
    ))
}
