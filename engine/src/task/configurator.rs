// SPDX-License-Identifier: AGPL-3.0-only

//! Staged task configuration.
//!
//! A [`TaskConfigurator`] collects three fragments (hardware layout,
//! potential source, VIBWA parameters). Every setter validates its fragment
//! on the spot and replaces the previous one; completeness is checked only
//! when the configuration is snapshotted for submission.

use crate::error::EngineError;
use crate::physics::morse::MorsePotentialConfig;
use crate::physics::potential::PotentialSource;
use crate::physics::vibwa::{grid_bytes, VibwaAlgorithmConfig};
use crate::precision::Precision;
use epseon_forge::substrate::ComputeLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Buffer and dispatch layout of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Samples per potential curve slab.
    pub potential_buffer_size: u32,
    /// Invocations per work group.
    pub group_size: u32,
    /// Work groups per dispatch.
    pub dispatch_count: u32,
    /// Allocation granularity in bytes (power of two).
    pub allocation_block_size: u64,
}

impl HardwareConfig {
    #[must_use]
    pub const fn new(
        potential_buffer_size: u32,
        group_size: u32,
        dispatch_count: u32,
        allocation_block_size: u64,
    ) -> Self {
        Self {
            potential_buffer_size,
            group_size,
            dispatch_count,
            allocation_block_size,
        }
    }

    /// Three-value form: the dispatch count is the number of groups needed
    /// to cover the potential buffer.
    #[must_use]
    pub const fn legacy(
        potential_buffer_size: u32,
        group_size: u32,
        allocation_block_size: u64,
    ) -> Self {
        let dispatch_count = if group_size == 0 {
            0
        } else {
            potential_buffer_size.div_ceil(group_size)
        };
        Self::new(
            potential_buffer_size,
            group_size,
            dispatch_count,
            allocation_block_size,
        )
    }

    /// Total invocations of one dispatch.
    #[must_use]
    pub const fn grid_size(&self) -> u64 {
        self.group_size as u64 * self.dispatch_count as u64
    }

    /// # Errors
    ///
    /// [`EngineError::InvalidHardwareConfig`] for zero sizes, a block size
    /// that is not a power of two, or a grid smaller than the buffer.
    pub fn validate(&self) -> Result<(), EngineError> {
        let sizes = [
            ("potential_buffer_size", u64::from(self.potential_buffer_size)),
            ("group_size", u64::from(self.group_size)),
            ("dispatch_count", u64::from(self.dispatch_count)),
            ("allocation_block_size", self.allocation_block_size),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "{name} must be non-zero"
            )));
        }
        if !self.allocation_block_size.is_power_of_two() {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "allocation_block_size must be a power of two, got {}",
                self.allocation_block_size
            )));
        }
        if self.grid_size() < u64::from(self.potential_buffer_size) {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "dispatch grid {}x{} does not cover {} potential samples",
                self.group_size, self.dispatch_count, self.potential_buffer_size
            )));
        }
        Ok(())
    }
}

/// Immutable snapshot of a complete configurator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfiguration {
    pub precision: Precision,
    pub hardware: HardwareConfig,
    pub potential: PotentialSource,
    pub algorithm: VibwaAlgorithmConfig,
}

/// Byte footprint of a task: device buffers plus host integration grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRequirements {
    /// Curve slabs.
    pub potential: u64,
    /// Per-task and per-curve scalar parameters.
    pub params: u64,
    /// Per-task and per-curve integer metadata.
    pub meta: u64,
    /// Energy, tail and status per slot.
    pub output: u64,
    /// Integration grids of generated curves. Grids of tabulated curves are
    /// sized when the files are read.
    pub grids: u64,
}

impl MemoryRequirements {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.potential
            .saturating_add(self.params)
            .saturating_add(self.meta)
            .saturating_add(self.output)
            .saturating_add(self.grids)
    }
}

/// Scalars in the params buffer before the per-curve block.
pub const PARAM_HEADER: u64 = 6;
/// u32 words in the meta buffer before the per-curve block.
pub const META_HEADER: u64 = 7;
/// Per-curve entries in both params and meta.
pub const PER_CURVE: u64 = 4;
/// Output scalars per slot.
pub const OUTPUT_STRIDE: u64 = 3;

impl TaskConfiguration {
    #[must_use]
    pub fn curve_count(&self) -> usize {
        self.potential.curve_count()
    }

    /// (potential, level) pairs the solver visits.
    #[must_use]
    pub fn slot_count(&self) -> u64 {
        (self.curve_count() as u64).saturating_mul(u64::from(self.algorithm.level_count()))
    }

    /// Buffer sizes on a device with the given limits.
    ///
    /// # Errors
    ///
    /// [`EngineError::OutOfDeviceMemory`] when a single buffer or grid
    /// exceeds the device's maximum buffer size, or a size overflows `u64`.
    pub fn memory_requirements(
        &self,
        limits: &ComputeLimits,
    ) -> Result<MemoryRequirements, EngineError> {
        let too_large = |requested: u64| EngineError::OutOfDeviceMemory {
            requested,
            available: limits.max_buffer_size,
        };
        let overflow = || too_large(u64::MAX);
        let bytes = |count: u64, per_item: u64| count.checked_mul(per_item).ok_or_else(overflow);
        let scalar = self.precision.scalar_size();
        let curves = self.curve_count() as u64;
        let per_curve = PER_CURVE.saturating_mul(curves);
        let req = MemoryRequirements {
            potential: bytes(curves, u64::from(self.hardware.potential_buffer_size))?
                .checked_mul(scalar)
                .ok_or_else(overflow)?,
            params: bytes(PARAM_HEADER.saturating_add(per_curve), scalar)?,
            meta: bytes(META_HEADER.saturating_add(per_curve), 4)?,
            output: bytes(self.slot_count(), OUTPUT_STRIDE * scalar)?,
            grids: 0,
        };
        for size in [req.potential, req.params, req.meta, req.output] {
            if size > limits.max_buffer_size {
                return Err(too_large(size));
            }
        }

        let mut grids = 0_u64;
        if let PotentialSource::Morse(configs) = &self.potential {
            let step = self.algorithm.integration_step;
            for curve in configs {
                let size =
                    grid_bytes(curve.min_r, curve.max_r, step, scalar).ok_or_else(overflow)?;
                if size > limits.max_buffer_size {
                    return Err(too_large(size));
                }
                grids = grids.checked_add(size).ok_or_else(overflow)?;
            }
        }
        Ok(MemoryRequirements { grids, ..req })
    }
}

/// Builder for a [`TaskConfiguration`], bound to one precision.
#[derive(Debug, Clone)]
pub struct TaskConfigurator {
    precision: Precision,
    hardware: Option<HardwareConfig>,
    potential: Option<PotentialSource>,
    algorithm: Option<VibwaAlgorithmConfig>,
}

impl TaskConfigurator {
    #[must_use]
    pub const fn new(precision: Precision) -> Self {
        Self {
            precision,
            hardware: None,
            potential: None,
            algorithm: None,
        }
    }

    #[must_use]
    pub const fn precision(&self) -> Precision {
        self.precision
    }

    /// # Errors
    ///
    /// See [`HardwareConfig::validate`].
    pub fn set_hardware_config(
        &mut self,
        config: HardwareConfig,
    ) -> Result<&mut Self, EngineError> {
        config.validate()?;
        self.hardware = Some(config);
        Ok(self)
    }

    /// One curve per config, in order.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPotentialSpec`] for an empty list or the first
    /// invalid curve.
    pub fn set_morse_potential(
        &mut self,
        curves: Vec<MorsePotentialConfig>,
    ) -> Result<&mut Self, EngineError> {
        if curves.is_empty() {
            return Err(EngineError::InvalidPotentialSpec(
                "at least one morse curve is required".into(),
            ));
        }
        for (index, curve) in curves.iter().enumerate() {
            curve.validate(index)?;
        }
        self.potential = Some(PotentialSource::Morse(curves));
        Ok(self)
    }

    /// One curve per table file; files are read when the task runs.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPotentialSpec`] for an empty list.
    pub fn set_potential_files(&mut self, paths: Vec<PathBuf>) -> Result<&mut Self, EngineError> {
        if paths.is_empty() {
            return Err(EngineError::InvalidPotentialSpec(
                "at least one potential file is required".into(),
            ));
        }
        self.potential = Some(PotentialSource::Files(paths));
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`VibwaAlgorithmConfig::validate`].
    pub fn set_vibwa_algorithm(
        &mut self,
        config: VibwaAlgorithmConfig,
    ) -> Result<&mut Self, EngineError> {
        config.validate()?;
        self.algorithm = Some(config);
        Ok(self)
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.hardware.is_some() && self.potential.is_some() && self.algorithm.is_some()
    }

    /// Snapshot the configuration.
    ///
    /// # Errors
    ///
    /// [`EngineError::IncompleteConfiguration`] naming every unset stage,
    /// [`EngineError::InvalidAlgorithmSpec`] when curves × levels does not
    /// fit the kernel's 32-bit slot index.
    pub fn configuration(&self) -> Result<TaskConfiguration, EngineError> {
        match (&self.hardware, &self.potential, &self.algorithm) {
            (Some(hardware), Some(potential), Some(algorithm)) => {
                let config = TaskConfiguration {
                    precision: self.precision,
                    hardware: *hardware,
                    potential: potential.clone(),
                    algorithm: *algorithm,
                };
                if config.slot_count() > u64::from(u32::MAX) {
                    return Err(EngineError::InvalidAlgorithmSpec(format!(
                        "{} curves x {} levels exceed {} slots",
                        config.curve_count(),
                        algorithm.level_count(),
                        u32::MAX
                    )));
                }
                Ok(config)
            }
            _ => {
                let missing: Vec<&str> = [
                    ("hardware", self.hardware.is_none()),
                    ("potential", self.potential.is_none()),
                    ("algorithm", self.algorithm.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, unset)| unset.then_some(name))
                .collect();
                Err(EngineError::IncompleteConfiguration {
                    missing: missing.join(", "),
                })
            }
        }
    }
}
