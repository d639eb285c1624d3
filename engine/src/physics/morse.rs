// SPDX-License-Identifier: AGPL-3.0-only

//! Morse potential: V(r) = Dₑ·(1 − exp(−a·(r − rₑ)))².
//!
//! The well width is used directly as the exponent `a` in Å⁻¹. With the
//! kinetic factor K = ħ²/(2μ) the bound levels are known in closed form,
//! which is what [`MorseLevels`] provides for validation:
//!
//! ```text
//! ωₑ   = 2a·√(K·Dₑ)
//! ωₑxₑ = K·a²
//! E_v  = ωₑ(v + ½) − ωₑxₑ(v + ½)²      for v < √(Dₑ/K)/a − ½
//! ```

use crate::error::EngineError;
use crate::precision::Real;
use crate::tolerances::MIN_CURVE_POINTS;
use serde::{Deserialize, Serialize};

/// One Morse curve to discretize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorsePotentialConfig {
    /// Dₑ in cm⁻¹.
    pub dissociation_energy: f64,
    /// rₑ in Å.
    pub equilibrium_bond_distance: f64,
    /// a in Å⁻¹.
    pub well_width: f64,
    pub min_r: f64,
    pub max_r: f64,
    /// Sample count; `None` takes the task's potential-buffer size.
    #[serde(default)]
    pub point_count: Option<u32>,
}

impl MorsePotentialConfig {
    #[must_use]
    pub const fn new(
        dissociation_energy: f64,
        equilibrium_bond_distance: f64,
        well_width: f64,
        min_r: f64,
        max_r: f64,
        point_count: u32,
    ) -> Self {
        Self {
            dissociation_energy,
            equilibrium_bond_distance,
            well_width,
            min_r,
            max_r,
            point_count: Some(point_count),
        }
    }

    /// Curve sampled at the full potential-buffer size.
    #[must_use]
    pub const fn with_implicit_count(
        dissociation_energy: f64,
        equilibrium_bond_distance: f64,
        well_width: f64,
        min_r: f64,
        max_r: f64,
    ) -> Self {
        Self {
            dissociation_energy,
            equilibrium_bond_distance,
            well_width,
            min_r,
            max_r,
            point_count: None,
        }
    }

    /// Check the parameters of curve `index`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPotentialSpec`] naming the curve and field.
    pub fn validate(&self, index: usize) -> Result<(), EngineError> {
        let fields = [
            ("dissociation_energy", self.dissociation_energy),
            ("equilibrium_bond_distance", self.equilibrium_bond_distance),
            ("well_width", self.well_width),
            ("min_r", self.min_r),
            ("max_r", self.max_r),
        ];
        if let Some((name, v)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(index, format!("{name} must be finite, got {v}")));
        }
        if self.dissociation_energy <= 0.0 {
            return Err(invalid(
                index,
                format!(
                    "dissociation_energy must be positive, got {}",
                    self.dissociation_energy
                ),
            ));
        }
        if self.well_width <= 0.0 {
            return Err(invalid(
                index,
                format!("well_width must be positive, got {}", self.well_width),
            ));
        }
        if self.equilibrium_bond_distance < 0.0 {
            return Err(invalid(
                index,
                format!(
                    "equilibrium_bond_distance must not be negative, got {}",
                    self.equilibrium_bond_distance
                ),
            ));
        }
        if self.min_r >= self.max_r {
            return Err(invalid(
                index,
                format!("min_r ({}) must be below max_r ({})", self.min_r, self.max_r),
            ));
        }
        if let Some(n) = self.point_count {
            if n < MIN_CURVE_POINTS {
                return Err(invalid(
                    index,
                    format!("point_count must be at least {MIN_CURVE_POINTS}, got {n}"),
                ));
            }
        }
        Ok(())
    }

    /// V(r) in the requested precision.
    #[must_use]
    pub fn value<T: Real>(&self, r: T) -> T {
        let de = T::from_f64(self.dissociation_energy);
        let a = T::from_f64(self.well_width);
        let re = T::from_f64(self.equilibrium_bond_distance);
        let s = T::ONE - (-(a * (r - re))).exp();
        de * s * s
    }

    /// Sample `count` evenly spaced points over `[min_r, max_r]` into `out`,
    /// starting at sample index `offset`.
    pub fn sample_into<T: Real>(&self, count: u32, offset: usize, out: &mut [T]) {
        let dr = (self.max_r - self.min_r) / f64::from(count.saturating_sub(1).max(1));
        for (i, slot) in out.iter_mut().enumerate() {
            let r = self.min_r + (offset + i) as f64 * dr;
            *slot = self.value(T::from_f64(r));
        }
    }
}

fn invalid(index: usize, msg: String) -> EngineError {
    EngineError::InvalidPotentialSpec(format!("morse curve {index}: {msg}"))
}

/// Closed-form Morse levels for a given kinetic factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorseLevels {
    pub omega_e: f64,
    pub omega_e_x_e: f64,
    /// Number of bound levels of the infinite-range potential.
    pub bound_levels: u32,
}

impl MorseLevels {
    #[must_use]
    pub fn new(config: &MorsePotentialConfig, kinetic: f64) -> Self {
        let a = config.well_width;
        let de = config.dissociation_energy;
        let omega_e = 2.0 * a * (kinetic * de).sqrt();
        let omega_e_x_e = kinetic * a * a;
        let v_max = (de / kinetic).sqrt() / a - 0.5;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bound_levels = if v_max < 0.0 { 0 } else { v_max.floor() as u32 + 1 };
        Self {
            omega_e,
            omega_e_x_e,
            bound_levels,
        }
    }

    /// Energy of level `v` above the potential minimum.
    #[must_use]
    pub fn energy(&self, v: u32) -> f64 {
        let x = f64::from(v) + 0.5;
        self.omega_e * x - self.omega_e_x_e * x * x
    }
}
