//! heatflow CLI: run a diffusion simulation from a grid file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use heatflow_sim::BackendKind;
use heatflow_types::HeatflowError;

mod commands;

#[derive(Parser)]
#[command(name = "heatflow")]
#[command(version, about = "Stencil heat diffusion on a compute backend")]
pub(crate) struct Cli {
    /// Input grid file.
    pub(crate) input: PathBuf,

    /// Output grid file (overwritten).
    pub(crate) output: PathBuf,

    /// Global work-item count per dispatch.
    pub(crate) work_items: usize,

    /// Requested work-group size (clamped to the device limit).
    pub(crate) work_group_size: usize,

    /// Fraction of each temperature removed per iteration, in [0, 1).
    #[arg(long, value_name = "RATE")]
    pub(crate) decay_rate: Option<f64>,

    /// TOML file with [simulation] and [render] tables.
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// Draw the grid in the terminal after every iteration.
    #[arg(long)]
    pub(crate) render: bool,

    /// Compute backend.
    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    pub(crate) backend: Backend,

    /// Do not upload the host `next` buffer before each dispatch.
    #[arg(long)]
    pub(crate) skip_next_upload: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Backend {
    Cpu,
    Wgpu,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Cpu => BackendKind::Cpu,
            Backend::Wgpu => BackendKind::Wgpu,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(HeatflowError::Usage(e.to_string()).exit_code());
        }
    };

    init_logging(cli.verbose);

    match commands::simulate(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
