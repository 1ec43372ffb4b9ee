//! Error types for the heatflow engine.
//!
//! All crates return `HeatflowResult<T>` from fallible operations.
//! Compute backends report failures as [`DeviceError`], which the
//! driver lifts into [`HeatflowError::Backend`] together with the
//! source location of the failing call.

use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

use crate::status;

/// A failed compute-backend call: numeric status code plus detail.
///
/// Codes follow the OpenCL status numbering (see [`crate::status`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail} (code {code} {})", status_label(.code))]
pub struct DeviceError {
    /// Backend status code. Always negative for failures.
    pub code: i32,
    /// Human-readable description.
    pub detail: String,
}

impl DeviceError {
    pub fn new(code: i32, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

fn status_label(code: &i32) -> &'static str {
    status::name(*code)
}

/// Unified error type for the heatflow engine.
#[derive(Debug, Error)]
pub enum HeatflowError {
    /// Command-line arguments are missing or malformed.
    #[error("Usage: {0}")]
    Usage(String),

    /// Opening, reading or writing a file failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file content does not follow the grid format.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Host memory could not be reserved.
    #[error("Failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Grid data is inconsistent.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// A compute-backend call failed.
    #[error("{call} failed at {file}:{line}: {source}")]
    Backend {
        call: &'static str,
        file: &'static str,
        line: u32,
        #[source]
        source: DeviceError,
    },
}

impl HeatflowError {
    /// Wraps a backend failure, recording the caller's file and line.
    #[track_caller]
    pub fn backend(call: &'static str, source: DeviceError) -> Self {
        let location = Location::caller();
        Self::Backend {
            call,
            file: location.file(),
            line: location.line(),
            source,
        }
    }

    /// Wraps an I/O failure on `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Io { .. } | Self::Parse { .. } => 3,
            Self::Allocation { .. } => 4,
            Self::Backend { .. } => 5,
            Self::InvalidConfig(_) | Self::InvalidGrid(_) => 6,
        }
    }
}

/// Convenience alias for `Result<T, HeatflowError>`.
pub type HeatflowResult<T> = Result<T, HeatflowError>;

/// Lifts a backend result into a [`HeatflowResult`] at the call site.
///
/// ```text
/// backend.finish().on_device("finish")?;
/// ```
pub trait DeviceResultExt<T> {
    /// Tags a failure with `call` and the location of this method call.
    fn on_device(self, call: &'static str) -> HeatflowResult<T>;
}

impl<T> DeviceResultExt<T> for Result<T, DeviceError> {
    #[track_caller]
    fn on_device(self, call: &'static str) -> HeatflowResult<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(HeatflowError::backend(call, err)),
        }
    }
}
