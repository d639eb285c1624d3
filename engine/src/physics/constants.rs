// SPDX-License-Identifier: AGPL-3.0-only

//! Physical constants (CODATA 2018) in spectroscopic units.
//!
//! Energies in cm⁻¹, distances in Å, masses in Da.

/// ħ²/(2·1 Da·1 Å²) expressed in cm⁻¹.
pub const HBAR2_OVER_2DA_A2: f64 = 16.857_629_206;

/// Reduced mass μ = m0·m1/(m0+m1), in Da.
#[must_use]
pub fn reduced_mass(m0: f64, m1: f64) -> f64 {
    m0 * m1 / (m0 + m1)
}

/// Kinetic prefactor ħ²/(2μ) of the radial equation, in cm⁻¹·Å².
#[must_use]
pub fn kinetic_factor(m0: f64, m1: f64) -> f64 {
    HBAR2_OVER_2DA_A2 / reduced_mass(m0, m1)
}
