// SPDX-License-Identifier: AGPL-3.0-only

//! Hardware probing: GPUs via wgpu, the host CPU via procfs.
//!
//! GPU discovery gets adapter name, device type, driver, backend, limits and
//! feature flags (`SHADER_F64`) directly from the wgpu layer. CPU discovery
//! reads `/proc/cpuinfo` for model, thread count and SIMD flags and
//! `/proc/meminfo` for the host heap size.

use crate::substrate::{
    Capability, ComputeLimits, DeviceDescriptor, DeviceKind, HeapFlag, MemoryHeap,
    MemoryProperty, MemoryType, Route, HOST_DEVICE_ID,
};
use std::fs;
use tracing::debug;

/// Host heap size assumed when `/proc/meminfo` is unreadable.
pub const FALLBACK_HOST_MEMORY: u64 = 4 * 1024 * 1024 * 1024;

/// Base of the ids handed to adapters that report no PCI device id.
const ANONYMOUS_ADAPTER_BASE: u32 = 0x0001_0000;

/// wgpu backends selected by `EPSEON_WGPU_BACKEND`.
#[must_use]
pub fn backends_from_env() -> wgpu::Backends {
    match std::env::var("EPSEON_WGPU_BACKEND").as_deref() {
        Ok("vulkan") => wgpu::Backends::VULKAN,
        Ok("metal") => wgpu::Backends::METAL,
        Ok("dx12") => wgpu::Backends::DX12,
        Ok("gl") => wgpu::Backends::GL,
        _ => wgpu::Backends::all(),
    }
}

/// Create a wgpu instance over the given backends.
#[must_use]
pub fn create_instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Probe all GPU adapters via wgpu.
///
/// Software rasterizers (wgpu `DeviceType::Cpu`) are skipped: the host
/// descriptor already covers CPU execution. Adapter indices in the
/// returned [`Route`]s refer to `instance.enumerate_adapters(backends)`.
#[must_use]
pub fn probe_gpus(backends: wgpu::Backends) -> Vec<DeviceDescriptor> {
    let instance = create_instance(backends);
    let adapters = instance.enumerate_adapters(backends);
    let host_memory = parse_meminfo().unwrap_or(FALLBACK_HOST_MEMORY);
    let mut gpus = Vec::new();

    for (idx, adapter) in adapters.into_iter().enumerate() {
        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            debug!(adapter = %info.name, "skipping software adapter");
            continue;
        }
        let features = adapter.features();
        let limits = adapter.limits();

        let mut capabilities = vec![Capability::F32Compute, Capability::ShaderDispatch];
        if features.contains(wgpu::Features::SHADER_F64) {
            capabilities.push(Capability::F64Compute);
        }
        if features.contains(wgpu::Features::TIMESTAMP_QUERY) {
            capabilities.push(Capability::TimestampQuery);
        }

        let kind = DeviceKind::from(info.device_type);
        let (memory_heaps, memory_types) =
            gpu_memory_layout(kind, limits.max_buffer_size, host_memory);
        let id = if info.device == 0 {
            ANONYMOUS_ADAPTER_BASE + idx as u32
        } else {
            info.device
        };

        gpus.push(DeviceDescriptor {
            id,
            vendor_id: info.vendor,
            kind,
            name: info.name.clone(),
            api_version: format!("{:?}", info.backend),
            driver_version: format!("{} ({})", info.driver, info.driver_info),
            limits: ComputeLimits {
                max_shared_memory_size: limits.max_compute_workgroup_storage_size,
                max_work_group_count: [limits.max_compute_workgroups_per_dimension; 3],
                max_invocations: limits.max_compute_invocations_per_workgroup,
                max_work_group_size: [
                    limits.max_compute_workgroup_size_x,
                    limits.max_compute_workgroup_size_y,
                    limits.max_compute_workgroup_size_z,
                ],
                max_buffer_size: limits.max_buffer_size,
            },
            memory_heaps,
            memory_types,
            capabilities,
            route: Route::Adapter {
                index: idx,
                backend: format!("{:?}", info.backend),
            },
        });
    }

    gpus
}

/// Heaps and memory types of a GPU.
///
/// wgpu exposes no heap query; the largest buffer the adapter accepts stands
/// in for its device-local heap. Discrete parts get a separate host heap,
/// integrated parts share one heap for both.
fn gpu_memory_layout(
    kind: DeviceKind,
    max_buffer: u64,
    host_memory: u64,
) -> (Vec<MemoryHeap>, Vec<MemoryType>) {
    if kind == DeviceKind::IntegratedGpu {
        let heaps = vec![MemoryHeap {
            size: max_buffer,
            flags: vec![HeapFlag::DeviceLocal],
        }];
        let types = vec![MemoryType {
            flags: vec![
                MemoryProperty::DeviceLocal,
                MemoryProperty::HostVisible,
                MemoryProperty::HostCoherent,
            ],
            heap_index: 0,
        }];
        return (heaps, types);
    }
    let heaps = vec![
        MemoryHeap {
            size: max_buffer,
            flags: vec![HeapFlag::DeviceLocal],
        },
        MemoryHeap {
            size: host_memory,
            flags: Vec::new(),
        },
    ];
    let types = vec![
        MemoryType {
            flags: vec![MemoryProperty::DeviceLocal],
            heap_index: 0,
        },
        MemoryType {
            flags: vec![MemoryProperty::HostVisible, MemoryProperty::HostCoherent],
            heap_index: 1,
        },
    ];
    (heaps, types)
}

/// Probe the host CPU via `/proc/cpuinfo` and `/proc/meminfo`.
#[must_use]
pub fn probe_cpu() -> DeviceDescriptor {
    let cpu = parse_cpuinfo();
    let mem_bytes = parse_meminfo().unwrap_or(FALLBACK_HOST_MEMORY);
    let threads = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);

    let mut capabilities = vec![Capability::F64Compute, Capability::F32Compute];
    if cpu.has_avx2 {
        capabilities.push(Capability::SimdVector);
    }

    DeviceDescriptor {
        id: HOST_DEVICE_ID,
        vendor_id: cpu.vendor_id,
        kind: DeviceKind::Cpu,
        name: cpu.model.unwrap_or_else(|| String::from("Unknown CPU")),
        api_version: String::from("host"),
        driver_version: format!("rayon ({threads} threads)"),
        limits: ComputeLimits {
            max_shared_memory_size: cpu.cache_kb.saturating_mul(1024),
            max_work_group_count: [u32::MAX; 3],
            max_invocations: u32::MAX,
            max_work_group_size: [u32::MAX, 1, 1],
            max_buffer_size: mem_bytes,
        },
        memory_heaps: vec![MemoryHeap {
            size: mem_bytes,
            flags: vec![HeapFlag::DeviceLocal],
        }],
        memory_types: vec![MemoryType {
            flags: vec![
                MemoryProperty::DeviceLocal,
                MemoryProperty::HostVisible,
                MemoryProperty::HostCoherent,
                MemoryProperty::HostCached,
            ],
            heap_index: 0,
        }],
        capabilities,
        route: Route::Host { threads },
    }
}

#[derive(Debug, Default)]
struct CpuInfo {
    model: Option<String>,
    vendor_id: u32,
    cache_kb: u32,
    has_avx2: bool,
}

fn parse_cpuinfo() -> CpuInfo {
    let Ok(content) = fs::read_to_string("/proc/cpuinfo") else {
        return CpuInfo::default();
    };
    parse_cpuinfo_text(&content)
}

fn parse_cpuinfo_text(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();
    for line in content.lines() {
        if let Some((key, val)) = line.split_once(':') {
            let val = val.trim();
            match key.trim() {
                "model name" if info.model.is_none() => info.model = Some(val.to_string()),
                "vendor_id" if info.vendor_id == 0 => {
                    info.vendor_id = match val {
                        "GenuineIntel" => 0x8086,
                        "AuthenticAMD" => 0x1022,
                        _ => 0,
                    };
                }
                "cache size" if info.cache_kb == 0 => {
                    info.cache_kb = val.trim_end_matches(" KB").parse().unwrap_or(0);
                }
                "flags" if !info.has_avx2 => {
                    info.has_avx2 = val.split_whitespace().any(|f| f == "avx2");
                }
                _ => {}
            }
        }
    }
    info
}

fn parse_meminfo() -> Option<u64> {
    let content = fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_text(&content)
}

fn parse_meminfo_text(content: &str) -> Option<u64> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb_str = rest.trim().trim_end_matches(" kB").trim();
            let kb: u64 = kb_str.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}
