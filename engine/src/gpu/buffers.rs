// SPDX-License-Identifier: AGPL-3.0-only

//! Storage buffer creation, upload and readback for `Pod` data.

use super::GpuDevice;
use crate::error::EngineError;
use wgpu::util::DeviceExt;

impl GpuDevice {
    /// Read-only storage buffer initialized from `data`.
    #[must_use]
    pub fn create_storage_buffer<T: bytemuck::Pod>(&self, data: &[T], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Writable storage buffer of `size` bytes for kernel output.
    #[must_use]
    pub fn create_output_buffer(&self, size: u64, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// Host-mappable buffer the output is copied into.
    #[must_use]
    pub fn create_staging_buffer(&self, size: u64, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Map a staging buffer after submission, block until ready and copy its
    /// contents out.
    ///
    /// # Errors
    ///
    /// [`EngineError::GpuCompute`] if mapping fails or the callback is lost.
    pub fn read_staging<T: bytemuck::Pod>(
        &self,
        staging: &wgpu::Buffer,
    ) -> Result<Vec<T>, EngineError> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| EngineError::GpuCompute("map callback: channel closed".into()))?
            .map_err(|e| EngineError::GpuCompute(format!("buffer mapping: {e}")))?;

        let data = slice.get_mapped_range();
        let values = mapped_bytes_to::<T>(&data);
        drop(data);
        staging.unmap();
        Ok(values)
    }
}

/// Reinterpret mapped bytes, copying through an aligned buffer when the
/// mapping is not aligned for `T`.
pub fn mapped_bytes_to<T: bytemuck::Pod>(data: &[u8]) -> Vec<T> {
    bytemuck::try_cast_slice(data).map_or_else(
        |_| {
            let count = data.len() / std::mem::size_of::<T>();
            let mut out = vec![<T as bytemuck::Zeroable>::zeroed(); count];
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut out);
            let len = bytes.len();
            bytes.copy_from_slice(&data[..len]);
            out
        },
        <[T]>::to_vec,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn unaligned_bytes_still_decode() {
        let values = [1.5_f64, -2.25, 1e300];
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(bytemuck::cast_slice(&values));
        let decoded: Vec<f64> = mapped_bytes_to(&bytes[1..]);
        assert_eq!(decoded, values);
    }

    #[test]
    fn u32_words_decode() {
        let words = [7u32, 0, u32::MAX];
        let decoded: Vec<u32> = mapped_bytes_to(bytemuck::cast_slice(&words));
        assert_eq!(decoded, words);
    }
}
