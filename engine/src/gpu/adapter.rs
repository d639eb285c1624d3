// SPDX-License-Identifier: AGPL-3.0-only

//! Resolve a catalog route to a live wgpu adapter.
//!
//! Catalog routes store the adapter's position in
//! `enumerate_adapters(backends)`; enumeration order is stable for a given
//! driver state, so re-enumerating with the same backends finds it again.

use crate::error::EngineError;
use epseon_forge::probe::create_instance;
use tracing::debug;

/// Adapter `index` of the enumeration over `backends`.
///
/// # Errors
///
/// [`EngineError::DeviceCreation`] when the index is past the end of the
/// enumeration (adapter removed since the catalog was built).
pub fn adapter_at(backends: wgpu::Backends, index: usize) -> Result<wgpu::Adapter, EngineError> {
    let instance = create_instance(backends);
    let adapters = instance.enumerate_adapters(backends);
    let count = adapters.len();
    let adapter = adapters.into_iter().nth(index).ok_or_else(|| {
        EngineError::DeviceCreation(format!(
            "adapter {index} not present ({count} adapters enumerated)"
        ))
    })?;
    debug!(index, adapter = %adapter.get_info().name, "adapter resolved");
    Ok(adapter)
}
