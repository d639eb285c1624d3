// SPDX-License-Identifier: AGPL-3.0-only

//! Device catalog: unified view of every device on this machine.
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `EPSEON_BACKEND` | `all`, `gpu`, `cpu` | `all` |
//! | `EPSEON_WGPU_BACKEND` | `vulkan`, `metal`, `dx12`, `gl` | all backends |
//! | `EPSEON_DEVICE` | `auto`, index, name substring | `auto` |

use crate::error::CatalogError;
use crate::probe;
use crate::substrate::{DeviceDescriptor, HeapFlag};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Which device classes enumeration reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendSelection {
    /// GPUs in wgpu order, then the host CPU.
    #[default]
    All,
    GpuOnly,
    CpuOnly,
}

impl FromStr for BackendSelection {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "gpu" | "gpu-only" => Ok(Self::GpuOnly),
            "cpu" | "cpu-only" => Ok(Self::CpuOnly),
            other => Err(CatalogError::InvalidSelection(other.to_string())),
        }
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::GpuOnly => "gpu",
            Self::CpuOnly => "cpu",
        })
    }
}

impl BackendSelection {
    /// Read `EPSEON_BACKEND`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidSelection`] for unknown values.
    pub fn from_env() -> Result<Self, CatalogError> {
        std::env::var("EPSEON_BACKEND").map_or(Ok(Self::All), |v| v.parse())
    }
}

/// Ordered, immutable list of discovered devices.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: Vec<DeviceDescriptor>,
    wgpu_backends: wgpu::Backends,
}

impl DeviceCatalog {
    /// Enumerate devices for a selection.
    ///
    /// # Errors
    ///
    /// [`CatalogError::BackendUnavailable`] if nothing was found.
    pub fn enumerate(selection: BackendSelection) -> Result<Self, CatalogError> {
        let wgpu_backends = probe::backends_from_env();
        let mut devices = Vec::new();
        if selection != BackendSelection::CpuOnly {
            devices.extend(probe::probe_gpus(wgpu_backends));
        }
        if selection != BackendSelection::GpuOnly {
            devices.push(probe::probe_cpu());
        }
        let catalog = Self::from_devices(devices, wgpu_backends);
        if catalog.devices.is_empty() {
            return Err(CatalogError::BackendUnavailable {
                selection: selection.to_string(),
            });
        }
        info!(
            devices = catalog.devices.len(),
            %selection,
            "device catalog enumerated"
        );
        Ok(catalog)
    }

    /// Enumerate with the selection from `EPSEON_BACKEND`.
    ///
    /// # Errors
    ///
    /// See [`Self::enumerate`] and [`BackendSelection::from_env`].
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::enumerate(BackendSelection::from_env()?)
    }

    /// Build a catalog from already probed descriptors, making ids unique.
    #[must_use]
    pub fn from_devices(mut devices: Vec<DeviceDescriptor>, wgpu_backends: wgpu::Backends) -> Self {
        let mut seen = HashSet::new();
        for (idx, dev) in devices.iter_mut().enumerate() {
            while !seen.insert(dev.id) {
                let bumped = dev.id.wrapping_add(idx as u32 + 1);
                debug!(from = dev.id, to = bumped, "duplicate device id");
                dev.id = bumped;
            }
        }
        Self {
            devices,
            wgpu_backends,
        }
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Backends the GPU routes in this catalog were enumerated with.
    #[must_use]
    pub const fn wgpu_backends(&self) -> wgpu::Backends {
        self.wgpu_backends
    }

    /// Look up a descriptor by id.
    ///
    /// # Errors
    ///
    /// [`CatalogError::DeviceNotFound`] for unknown ids.
    pub fn find(&self, id: u32) -> Result<&DeviceDescriptor, CatalogError> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or(CatalogError::DeviceNotFound { id })
    }

    /// Pick a device by selector: `auto` (first entry), index, or a
    /// case-insensitive name substring.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NoMatchingDevice`] if the selector matches nothing.
    pub fn select(&self, selector: &str) -> Result<&DeviceDescriptor, CatalogError> {
        let selector = selector.trim().to_lowercase();
        if selector.is_empty() || selector == "auto" {
            return self
                .devices
                .iter()
                .min_by_key(|d| d.kind.rank())
                .ok_or_else(|| CatalogError::NoMatchingDevice(selector.clone()));
        }
        if let Ok(idx) = selector.parse::<usize>() {
            if let Some(dev) = self.devices.get(idx) {
                return Ok(dev);
            }
        }
        self.devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&selector))
            .ok_or(CatalogError::NoMatchingDevice(selector))
    }

    /// Pick a device using `EPSEON_DEVICE`.
    ///
    /// # Errors
    ///
    /// See [`Self::select`].
    pub fn select_from_env(&self) -> Result<&DeviceDescriptor, CatalogError> {
        let selector = std::env::var("EPSEON_DEVICE").unwrap_or_default();
        self.select(&selector)
    }
}

/// Print the catalog to stdout.
pub fn print_inventory(catalog: &DeviceCatalog) {
    println!("═══ Compute Devices ═══════════════════════════════════════");
    for (idx, dev) in catalog.iter().enumerate() {
        println!("  {idx}: {dev}");
        println!("      capabilities: {}", dev.capability_summary());
        let limits = &dev.limits;
        println!(
            "      work groups: {:?} x {:?} (max {} invocations), shared {}",
            limits.max_work_group_count,
            limits.max_work_group_size,
            limits.max_invocations,
            crate::format::adaptive_size_u64(u64::from(limits.max_shared_memory_size)),
        );
        for (h, heap) in dev.memory_heaps.iter().enumerate() {
            let flags: Vec<&str> = heap.flags.iter().map(HeapFlag::label).collect();
            println!(
                "      heap {h}: {} [{}]",
                crate::format::adaptive_size_u64(heap.size),
                flags.join("|")
            );
        }
        for ty in &dev.memory_types {
            let flags: Vec<&str> = ty.flags.iter().map(|f| f.label()).collect();
            println!("      type -> heap {}: [{}]", ty.heap_index, flags.join("|"));
        }
    }
    if catalog.is_empty() {
        println!("    (none found)");
    }
}
