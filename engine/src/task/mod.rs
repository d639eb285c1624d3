// SPDX-License-Identifier: AGPL-3.0-only

//! Task configuration, execution and handles.
//!
//! - `configurator` — staged builder and the immutable configuration
//! - `handle` — shared task record, status polling, blocking wait
//! - `scheduler` — per-interface dispatch worker
//! - `execute` — curve evaluation, slot partition, result assembly
//! - `results` — serializable task output

pub mod configurator;
mod execute;
pub mod handle;
pub mod results;
pub(crate) mod scheduler;

pub use configurator::{HardwareConfig, MemoryRequirements, TaskConfiguration, TaskConfigurator};
pub use handle::{TaskHandle, TaskState};
pub use results::{PotentialLevels, TaskResults, VibrationalLevel};
