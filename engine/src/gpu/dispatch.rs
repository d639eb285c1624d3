// SPDX-License-Identifier: AGPL-3.0-only

//! Bind groups and single-submission dispatch with readback.
//!
//! ```text
//! create_bind_group()  → buffers at bindings 0, 1, 2, …
//! dispatch_and_read()  → one compute pass + copy → ONE submission → map
//! ```

use super::GpuDevice;
use crate::error::EngineError;

/// Per-dimension workgroup limit guaranteed by wgpu's default limits.
pub const MAX_WORKGROUPS_PER_DIM: u32 = 65535;

/// Split a workgroup count into (x, y, 1) when it exceeds one dimension.
/// Kernels linearize with `gid.x + gid.y * num_workgroups.x * WG_SIZE`.
#[must_use]
pub const fn split_workgroups(total: u32) -> (u32, u32, u32) {
    if total <= MAX_WORKGROUPS_PER_DIM {
        (total, 1, 1)
    } else {
        let y = total.div_ceil(MAX_WORKGROUPS_PER_DIM);
        let x = total.div_ceil(y);
        (x, y, 1)
    }
}

impl GpuDevice {
    /// Bind `buffers` in order at bindings 0, 1, 2, … of group 0.
    #[must_use]
    pub fn create_bind_group(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
    ) -> wgpu::BindGroup {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .zip(0u32..)
            .map(|(buf, binding)| wgpu::BindGroupEntry {
                binding,
                resource: buf.as_entire_binding(),
            })
            .collect();
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vibwa_bind_group"),
            layout: &layout,
            entries: &entries,
        })
    }

    /// Dispatch `workgroups` groups, copy `output` to a staging buffer in
    /// the same submission and read it back.
    ///
    /// # Errors
    ///
    /// [`EngineError::GpuCompute`] if the readback mapping fails.
    pub fn dispatch_and_read<T: bytemuck::Pod>(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        workgroups: u32,
        output: &wgpu::Buffer,
    ) -> Result<Vec<T>, EngineError> {
        let staging = self.create_staging_buffer(output.size(), "vibwa_staging");
        let mut encoder = self
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vibwa"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("vibwa_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let (wx, wy, wz) = split_workgroups(workgroups);
            pass.dispatch_workgroups(wx, wy, wz);
        }
        encoder.copy_buffer_to_buffer(output, 0, &staging, 0, output.size());
        self.queue().submit(std::iter::once(encoder.finish()));
        self.read_staging(&staging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_stay_one_dimensional() {
        assert_eq!(split_workgroups(1), (1, 1, 1));
        assert_eq!(split_workgroups(65535), (65535, 1, 1));
    }

    #[test]
    fn large_counts_cover_total() {
        for total in [65536, 200_000, 4_000_000] {
            let (x, y, z) = split_workgroups(total);
            assert!(x <= MAX_WORKGROUPS_PER_DIM && y <= MAX_WORKGROUPS_PER_DIM);
            assert_eq!(z, 1);
            assert!(u64::from(x) * u64::from(y) >= u64::from(total));
        }
    }
}
