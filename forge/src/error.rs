// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for device discovery and size formatting.

use thiserror::Error;

/// Errors arising from device enumeration and lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The requested backend selection produced no usable device.
    #[error("no compute device available (backend selection: {selection})")]
    BackendUnavailable { selection: String },

    /// A device id did not match any descriptor in the catalog.
    #[error("device {id:#010x} not found (stale or unknown id)")]
    DeviceNotFound { id: u32 },

    /// A name or index selector matched nothing.
    #[error("no device matching selector '{0}'")]
    NoMatchingDevice(String),

    /// `EPSEON_BACKEND` held something other than `all`, `gpu` or `cpu`.
    #[error("unknown backend selection '{0}' (expected all, gpu or cpu)")]
    InvalidSelection(String),
}

/// Errors from [`crate::format::adaptive_size`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("Values below 0 are not allowed, got {0}")]
    NegativeSize(i128),
}
