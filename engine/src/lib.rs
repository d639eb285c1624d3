// SPDX-License-Identifier: AGPL-3.0-only

#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Epseon engine: vibrational levels of diatomic potentials on GPU compute
//! devices, with a host fallback.
//!
//! A caller enumerates devices with [`DeviceCatalog`], binds one through a
//! [`DeviceInterface`], builds a task with the staged [`TaskConfigurator`]
//! and submits it. Submission returns a [`TaskHandle`] immediately; the
//! task runs on the interface's dispatch worker.
//!
//! ```text
//!   DeviceCatalog ─bind─▶ DeviceInterface ─get_task_configurator─▶ TaskConfigurator
//!                               │                                        │
//!                               └────────────── submit_task ◀────────────┘
//!                                                   │
//!                                    TaskHandle (status, wait, results)
//! ```
//!
//! ## Modules
//!   - `physics` — Morse and tabulated potentials, the VIBWA solver
//!   - `task` — configurator, scheduler, handles, results
//!   - `gpu` — wgpu device, buffers and the VIBWA kernel
//!   - `device` — interfaces bound to catalog devices
//!   - `allocator` — block-granular device memory accounting
//!
//! ## Binaries
//!   - `vibwa_levels` — run a task file (or the Sr₂ demo) and print JSON
//!   - `validate_vibwa` — solver levels vs closed-form Morse levels

pub mod allocator;
pub mod config;
pub mod device;
pub mod error;
pub mod gpu;
pub mod physics;
pub mod precision;
pub mod task;
pub mod tolerances;
pub mod validation;

pub use epseon_forge::format;
pub use epseon_forge::{BackendSelection, DeviceCatalog, DeviceDescriptor};

pub use config::{init_tracing, EngineConfig};
pub use device::DeviceInterface;
pub use error::{EngineError, FailureReason};
pub use precision::{Precision, Real};
pub use task::{
    HardwareConfig, PotentialLevels, TaskConfiguration, TaskConfigurator, TaskHandle, TaskResults,
    TaskState, VibrationalLevel,
};
