// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized solver limits and validation tolerances.
//!
//! Every threshold used by the solver, the device kernel and the validation
//! binary is defined here. No ad-hoc magic numbers.

// ═══════════════════════════════════════════════════════════════════
// Solver limits
// ═══════════════════════════════════════════════════════════════════

/// Bisection budget per level.
///
/// The bracket collapses to the relative energy tolerance of the precision
/// in ~20 (f32) or ~40 (f64) halvings; anything beyond this budget means
/// the node count never settled.
pub const VIBWA_MAX_BISECTIONS: u32 = 200;

/// Cap on h²·g/12 in the Numerov recurrence.
///
/// Deep in classically forbidden regions h²(V−E)/(12K) grows past 1 and the
/// recurrence coefficient changes sign, which fakes nodes. Clamping keeps
/// the solution decaying monotonically there.
pub const NUMEROV_FORBIDDEN_CLAMP: f64 = 0.5;

/// Minimum number of integration grid points.
pub const MIN_GRID_POINTS: usize = 3;

/// Largest h²·(V(r_max) − V_min)/(12K) accepted for an integration grid.
///
/// This is (k·h)²/12 at the top of the well, k the local wave number. At
/// 0.02 the grid keeps about 12 points per wavelength; coarser grids shift
/// levels by whole percents and can still converge, so they are refused.
pub const NUMEROV_MAX_WELL_U: f64 = 0.02;

/// Upper bound on `max_level − min_level + 1` of one task.
pub const MAX_LEVELS_PER_CURVE: u32 = 1 << 16;

/// Minimum samples in an explicitly sized potential curve.
pub const MIN_CURVE_POINTS: u32 = 3;

// ═══════════════════════════════════════════════════════════════════
// Validation tolerances (analytic Morse levels)
// ═══════════════════════════════════════════════════════════════════

/// Relative error of f64 levels against E_v = ω(v+½) − ωx(v+½)².
///
/// Numerov is O(h⁴); at ≥30 points per local wavelength the level error is
/// below 1e-4 relative, the remainder is grid truncation of the inner wall.
pub const MORSE_LEVEL_REL_F64: f64 = 1e-3;

/// Relative error of f32 levels against the analytic Morse levels.
///
/// f32 bisection resolves the bracket to ~1e-6 relative; accumulated
/// rounding in the recurrence over 10⁴ steps adds ~1e-4.
pub const MORSE_LEVEL_REL_F32: f64 = 5e-3;

/// Agreement between GPU and host energies of the same precision.
pub const GPU_VS_HOST_REL: f64 = 1e-4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_ordering() {
        assert!(MORSE_LEVEL_REL_F64 < MORSE_LEVEL_REL_F32);
        assert!(GPU_VS_HOST_REL < MORSE_LEVEL_REL_F64);
    }

    #[test]
    fn clamp_keeps_recurrence_denominator_positive() {
        assert!(NUMEROV_FORBIDDEN_CLAMP < 1.0);
        assert!(NUMEROV_FORBIDDEN_CLAMP > 0.0);
    }

    #[test]
    fn well_bound_sits_far_below_the_clamp() {
        assert!(NUMEROV_MAX_WELL_U > 0.0);
        assert!(NUMEROV_MAX_WELL_U < NUMEROV_FORBIDDEN_CLAMP / 10.0);
    }

    #[test]
    fn grid_minimum_supports_three_point_recurrence() {
        assert!(MIN_GRID_POINTS >= 3);
        assert!(MIN_CURVE_POINTS as usize >= MIN_GRID_POINTS);
    }
}
