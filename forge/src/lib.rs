// SPDX-License-Identifier: AGPL-3.0-only

#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Epseon Forge: compute device discovery and capability routing.
//!
//! Forge discovers which compute devices exist on THIS machine at runtime
//! and describes them as immutable [`substrate::DeviceDescriptor`]s: kind,
//! compute limits, memory heaps and types, capabilities. The engine binds
//! to one descriptor at a time.
//!
//! # Architecture
//!
//! ```text
//!    ┌─────────────────────────────┐
//!    │  probe (wgpu + procfs)      │  wgpu adapters + /proc
//!    └──────────┬──────────────────┘
//!               │ Vec<DeviceDescriptor>
//!    ┌──────────▼──────────────────┐
//!    │       inventory             │  DeviceCatalog, ids, selectors
//!    └──────────┬──────────────────┘
//!               │ &DeviceDescriptor
//!    ┌──────────▼──────────────────┐
//!    │       dispatch              │  capability-based routing
//!    └─────────────────────────────┘
//! ```

pub mod dispatch;
pub mod error;
pub mod format;
pub mod inventory;
pub mod probe;
pub mod substrate;

pub use error::{CatalogError, FormatError};
pub use inventory::{BackendSelection, DeviceCatalog};
pub use substrate::{Capability, DeviceDescriptor, DeviceKind};
