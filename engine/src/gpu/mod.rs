// SPDX-License-Identifier: AGPL-3.0-only

//! wgpu compute for the VIBWA kernel.
//!
//! A [`GpuDevice`] is opened on the adapter a catalog descriptor routes to,
//! requesting `SHADER_F64` when the adapter has it and the adapter's own
//! limits (so large potential slabs fit in one storage binding).
//!
//! ## Module structure
//!
//! - `adapter` — resolve a catalog route to a wgpu adapter
//! - `buffers` — storage/staging creation, upload, readback
//! - `dispatch` — bind groups, dispatch, workgroup splitting
//! - `vibwa` — kernel specialization, buffer layout, result decoding

mod adapter;
mod buffers;
mod dispatch;
pub(crate) mod vibwa;

pub use dispatch::split_workgroups;

use crate::error::EngineError;
use crate::precision::Precision;
use std::sync::Arc;
use tracing::info;

/// An open wgpu device and queue.
#[derive(Debug)]
pub struct GpuDevice {
    pub adapter_name: String,
    pub has_f64: bool,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuDevice {
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Whether the kernel can run in `precision` on this device.
    #[must_use]
    pub const fn supports(&self, precision: Precision) -> bool {
        match precision {
            Precision::Float32 => true,
            Precision::Float64 => self.has_f64,
        }
    }
}

impl GpuDevice {
    /// Open adapter `index` of `instance.enumerate_adapters(backends)`.
    ///
    /// # Errors
    ///
    /// [`EngineError::DeviceCreation`] if the adapter is gone or refuses the
    /// device request.
    pub async fn open(backends: wgpu::Backends, index: usize) -> Result<Self, EngineError> {
        let selected = adapter::adapter_at(backends, index)?;
        let adapter_info = selected.get_info();

        let mut required_features = wgpu::Features::empty();
        if selected.features().contains(wgpu::Features::SHADER_F64) {
            required_features |= wgpu::Features::SHADER_F64;
        }

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("epseon vibwa device"),
                    required_features,
                    required_limits: selected.limits(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| EngineError::DeviceCreation(e.to_string()))?;

        let has_f64 = required_features.contains(wgpu::Features::SHADER_F64);
        info!(adapter = %adapter_info.name, f64 = has_f64, "wgpu device opened");

        Ok(Self {
            adapter_name: adapter_info.name,
            has_f64,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// [`Self::open`] driven to completion on a private tokio runtime.
    ///
    /// # Errors
    ///
    /// As [`Self::open`]; runtime construction failures map to
    /// [`EngineError::DeviceCreation`].
    pub fn open_blocking(backends: wgpu::Backends, index: usize) -> Result<Self, EngineError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| EngineError::DeviceCreation(format!("tokio runtime: {e}")))?;
        rt.block_on(Self::open(backends, index))
    }

    /// Compile a WGSL compute shader with entry point `main`.
    #[must_use]
    pub fn create_pipeline(&self, wgsl: &str, label: &str) -> wgpu::ComputePipeline {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });
        self.device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires GPU"]
    fn first_adapter_opens() {
        let gpu = GpuDevice::open_blocking(wgpu::Backends::all(), 0).unwrap();
        assert!(!gpu.adapter_name.is_empty());
        assert!(gpu.supports(Precision::Float32));
        assert_eq!(gpu.supports(Precision::Float64), gpu.has_f64);
    }

    #[test]
    fn missing_adapter_is_a_creation_error() {
        let err = GpuDevice::open_blocking(wgpu::Backends::empty(), 0).unwrap_err();
        assert!(matches!(err, EngineError::DeviceCreation(_)), "{err:?}");
    }
}
