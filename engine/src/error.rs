// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for configuration, device interaction and task execution.
//!
//! Configuration errors are returned synchronously by the builder and
//! `submit_task`. Numerical failures never cross the submission call: they
//! are stored in the task's `Failed` state and surface through
//! [`crate::task::TaskHandle::wait`].

use epseon_forge::CatalogError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors arising from the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Precision token other than `float32` / `float64`.
    #[error("Invalid PrecisionType literal in string: \"{0}\"")]
    InvalidPrecision(String),

    #[error("invalid hardware config: {0}")]
    InvalidHardwareConfig(String),

    #[error("invalid potential spec: {0}")]
    InvalidPotentialSpec(String),

    #[error("invalid VIBWA algorithm spec: {0}")]
    InvalidAlgorithmSpec(String),

    /// `submit_task` on a configurator with unset stages.
    #[error("task configuration incomplete, missing: {missing}")]
    IncompleteConfiguration { missing: String },

    #[error("out of device memory: requested {requested} bytes, {available} bytes available")]
    OutOfDeviceMemory { requested: u64, available: u64 },

    /// A curve has more samples than the potential buffer holds.
    #[error("potential {potential_index} needs {required} samples but the potential buffer holds {capacity}")]
    BufferTooSmall {
        potential_index: usize,
        required: u64,
        capacity: u64,
    },

    #[error("potential {potential_index}, level {level}: {reason}")]
    ConvergenceFailure {
        potential_index: usize,
        level: u32,
        reason: FailureReason,
    },

    /// Tabulated potential could not be read or parsed.
    #[error("potential file {path}: {reason}")]
    PotentialLoad { path: String, reason: String },

    #[error("task did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    #[error("GPU compute failed: {0}")]
    GpuCompute(String),

    /// Dispatch worker or host pool could not be started or has gone away.
    #[error("scheduler unavailable: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Why the solver rejected a (potential, level) slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureReason {
    /// Potential minimum sits on a grid boundary.
    NoWell,
    /// Level lies at or above the dissociation asymptote.
    Unbound,
    /// Normalized wavefunction at the outer boundary exceeds the threshold.
    TailAboveThreshold { tail: f64, threshold: f64 },
    /// Energy bracket did not collapse within the bisection budget.
    NoConvergence,
    /// Fewer than three integration points between `min_r` and `max_r`, or
    /// a step too wide for Numerov to resolve the well.
    GridTooCoarse,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWell => write!(f, "no potential well (minimum on the grid boundary)"),
            Self::Unbound => write!(f, "level lies above the dissociation asymptote"),
            Self::TailAboveThreshold { tail, threshold } => write!(
                f,
                "asymptotic tail amplitude {tail:.3e} not below threshold {threshold:.3e}"
            ),
            Self::NoConvergence => write!(f, "energy bisection did not converge"),
            Self::GridTooCoarse => write!(f, "integration grid too coarse for the potential"),
        }
    }
}

impl FailureReason {
    /// Status code shared with the device kernel (0 means bound).
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::NoWell => 1,
            Self::Unbound => 2,
            Self::TailAboveThreshold { .. } => 3,
            Self::NoConvergence => 4,
            Self::GridTooCoarse => 5,
        }
    }
}
