// SPDX-License-Identifier: AGPL-3.0-only

//! Output of a completed task.

use crate::precision::Precision;
use serde::{Deserialize, Serialize};

/// One accepted bound level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationalLevel {
    pub level: u32,
    /// Absolute energy on the potential's scale, cm⁻¹.
    pub energy: f64,
    pub energy_above_minimum: f64,
    /// Å.
    pub inner_turning_point: f64,
    /// Å.
    pub outer_turning_point: f64,
    /// Normalized |ψ| at r_max.
    pub tail_amplitude: f64,
}

/// Levels of one potential, in increasing level index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialLevels {
    /// Position in the submitted source.
    pub potential_index: usize,
    /// Minimum of the integration grid, cm⁻¹.
    pub minimum_energy: f64,
    /// V(r_max), cm⁻¹.
    pub asymptote: f64,
    pub levels: Vec<VibrationalLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResults {
    pub precision: Precision,
    /// Name of the device the solver ran on.
    pub device: String,
    pub wall_time_ms: f64,
    pub potentials: Vec<PotentialLevels>,
}

impl TaskResults {
    /// Total accepted levels over all potentials.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.potentials.iter().map(|p| p.levels.len()).sum()
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
