// SPDX-License-Identifier: AGPL-3.0-only

//! Device descriptors: runtime-discovered compute devices.
//!
//! GPUs come from wgpu adapter enumeration, the host CPU from procfs.
//! Descriptors are immutable snapshots taken at enumeration time.
//!
//! Capabilities are what matters for selection: code asks "can you do f64?"
//! not "are you an RTX 4070?".

use crate::format::adaptive_size_u64;
use serde::Serialize;
use std::fmt;

/// Reserved id of the host CPU descriptor.
pub const HOST_DEVICE_ID: u32 = u32::MAX;

/// A compute device discovered at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    pub id: u32,
    /// PCI vendor id (0 when unknown).
    pub vendor_id: u32,
    pub kind: DeviceKind,
    pub name: String,
    /// Graphics/compute API the device is reached through, e.g. "Vulkan".
    pub api_version: String,
    /// Driver string, e.g. "NVIDIA (580.82.09)".
    pub driver_version: String,
    pub limits: ComputeLimits,
    pub memory_heaps: Vec<MemoryHeap>,
    pub memory_types: Vec<MemoryType>,
    pub capabilities: Vec<Capability>,
    pub route: Route,
}

/// The kind of compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceKind {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

/// How to reach the device when binding an interface to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Route {
    /// wgpu adapter, by enumeration index within the given backend set.
    Adapter { index: usize, backend: String },
    /// Host thread pool.
    Host { threads: usize },
}

/// Compute dispatch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComputeLimits {
    /// Workgroup shared memory in bytes.
    pub max_shared_memory_size: u32,
    /// Maximum number of work groups per dispatch axis.
    pub max_work_group_count: [u32; 3],
    /// Maximum invocations per work group.
    pub max_invocations: u32,
    /// Maximum work-group size per axis.
    pub max_work_group_size: [u32; 3],
    /// Largest single buffer the device accepts, in bytes.
    pub max_buffer_size: u64,
}

/// A memory heap and its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryHeap {
    pub size: u64,
    pub flags: Vec<HeapFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HeapFlag {
    DeviceLocal,
}

/// A memory type, backed by one heap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryType {
    pub flags: Vec<MemoryProperty>,
    pub heap_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemoryProperty {
    DeviceLocal,
    HostVisible,
    HostCoherent,
    HostCached,
}

/// A capability discovered at runtime on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    /// IEEE 754 f64 compute (GPU `SHADER_F64` or CPU native).
    F64Compute,
    F32Compute,
    /// WGSL shader dispatch via wgpu.
    ShaderDispatch,
    /// AVX2 SIMD on CPU.
    SimdVector,
    /// GPU timestamp query support.
    TimestampQuery,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DiscreteGpu => "discrete GPU",
            Self::IntegratedGpu => "integrated GPU",
            Self::VirtualGpu => "virtual GPU",
            Self::Cpu => "CPU",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl From<wgpu::DeviceType> for DeviceKind {
    fn from(ty: wgpu::DeviceType) -> Self {
        match ty {
            wgpu::DeviceType::DiscreteGpu => Self::DiscreteGpu,
            wgpu::DeviceType::IntegratedGpu => Self::IntegratedGpu,
            wgpu::DeviceType::VirtualGpu => Self::VirtualGpu,
            wgpu::DeviceType::Cpu => Self::Cpu,
            wgpu::DeviceType::Other => Self::Other,
        }
    }
}

impl DeviceKind {
    /// Whether work for this kind goes through wgpu.
    #[must_use]
    pub const fn is_gpu(self) -> bool {
        matches!(
            self,
            Self::DiscreteGpu | Self::IntegratedGpu | Self::VirtualGpu | Self::Other
        )
    }

    /// Selection priority; lower is preferred.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::DiscreteGpu => 0,
            Self::IntegratedGpu => 1,
            Self::VirtualGpu => 2,
            Self::Other => 3,
            Self::Cpu => 4,
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#010x}] {} [{}] {} {}",
            self.id, self.name, self.kind, self.api_version, self.driver_version
        )?;
        if let Some(size) = self.largest_heap() {
            write!(f, " {}", adaptive_size_u64(size))?;
        }
        Ok(())
    }
}

impl DeviceDescriptor {
    /// Check if this device has a specific capability.
    #[must_use]
    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    /// Return capabilities as a summary string.
    #[must_use]
    pub fn capability_summary(&self) -> String {
        let labels: Vec<&str> = self.capabilities.iter().map(|c| c.label()).collect();
        labels.join(", ")
    }

    /// Size of the largest memory heap, in bytes.
    #[must_use]
    pub fn largest_heap(&self) -> Option<u64> {
        self.memory_heaps.iter().map(|h| h.size).max()
    }

    /// Heap backing the memory type with the given property, if any.
    #[must_use]
    pub fn heap_with(&self, property: MemoryProperty) -> Option<&MemoryHeap> {
        self.memory_types
            .iter()
            .find(|t| t.flags.contains(&property))
            .and_then(|t| self.memory_heaps.get(t.heap_index))
    }
}

impl Capability {
    /// Human-readable label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::F64Compute => "f64",
            Self::F32Compute => "f32",
            Self::ShaderDispatch => "shader",
            Self::SimdVector => "simd",
            Self::TimestampQuery => "timestamps",
        }
    }
}

impl HeapFlag {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DeviceLocal => "DEVICE_LOCAL",
        }
    }
}

impl MemoryProperty {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DeviceLocal => "DEVICE_LOCAL",
            Self::HostVisible => "HOST_VISIBLE",
            Self::HostCoherent => "HOST_COHERENT",
            Self::HostCached => "HOST_CACHED",
        }
    }
}
