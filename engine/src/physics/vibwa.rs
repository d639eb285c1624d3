// SPDX-License-Identifier: AGPL-3.0-only

//! VIBWA: vibrational bound states of a discretized potential.
//!
//! The radial equation ψ'' = g(r)·ψ with g = (V − E)/K, K = ħ²/(2μ), is
//! integrated with Numerov's method on a uniform grid of step `h`:
//!
//! ```text
//! u_k = h²·g_k/12
//! y_{k+1}(1 − u_{k+1}) = 2·y_k(1 + 5u_k) − y_{k−1}(1 − u_{k−1})
//! ```
//!
//! Level `v` is located by bisection on the node count of the outward
//! solution (Sturm: N(E) levels lie below E), bracketed by the potential
//! minimum and the asymptote V(r_max). At the converged energy the outward
//! solution is matched to an inward one at the outer turning point; the
//! normalized amplitude at r_max is the asymptotic tail, which must fall
//! below `min_distance_to_asymptote` for the level to count as bound.
//!
//! The device kernel in `gpu/shaders/vibwa.wgsl` runs the same recurrence.

use crate::error::{EngineError, FailureReason};
use crate::physics::constants::{kinetic_factor, reduced_mass};
use crate::physics::potential::DiscretizedCurve;
use crate::precision::Real;
use crate::tolerances::{
    MAX_LEVELS_PER_CURVE, MIN_GRID_POINTS, NUMEROV_FORBIDDEN_CLAMP, NUMEROV_MAX_WELL_U,
    VIBWA_MAX_BISECTIONS,
};
use serde::{Deserialize, Serialize};

/// Solver parameters of a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibwaAlgorithmConfig {
    /// Da.
    pub mass_atom_0: f64,
    /// Da.
    pub mass_atom_1: f64,
    /// Numerov step h in Å.
    pub integration_step: f64,
    /// Largest accepted normalized tail amplitude at r_max.
    pub min_distance_to_asymptote: f64,
    pub min_level: u32,
    pub max_level: u32,
}

impl VibwaAlgorithmConfig {
    /// # Errors
    ///
    /// [`EngineError::InvalidAlgorithmSpec`] for non-positive masses, step or
    /// threshold, a reversed level range, or more than
    /// [`MAX_LEVELS_PER_CURVE`] levels.
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("mass_atom_0", self.mass_atom_0),
            ("mass_atom_1", self.mass_atom_1),
            ("integration_step", self.integration_step),
            ("min_distance_to_asymptote", self.min_distance_to_asymptote),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(EngineError::InvalidAlgorithmSpec(format!(
                    "{name} must be positive and finite, got {v}"
                )));
            }
        }
        if self.min_level > self.max_level {
            return Err(EngineError::InvalidAlgorithmSpec(format!(
                "min_level ({}) must not exceed max_level ({})",
                self.min_level, self.max_level
            )));
        }
        if self.level_count() > MAX_LEVELS_PER_CURVE {
            return Err(EngineError::InvalidAlgorithmSpec(format!(
                "level range {}..={} spans more than {MAX_LEVELS_PER_CURVE} levels",
                self.min_level, self.max_level
            )));
        }
        Ok(())
    }

    /// Levels in the inclusive range, saturating at `u32::MAX`.
    #[must_use]
    pub const fn level_count(&self) -> u32 {
        self.max_level
            .saturating_sub(self.min_level)
            .saturating_add(1)
    }

    #[must_use]
    pub fn reduced_mass(&self) -> f64 {
        reduced_mass(self.mass_atom_0, self.mass_atom_1)
    }

    /// ħ²/(2μ) in cm⁻¹·Å².
    #[must_use]
    pub fn kinetic_factor(&self) -> f64 {
        kinetic_factor(self.mass_atom_0, self.mass_atom_1)
    }
}

/// Precision-specific solver constants.
#[derive(Debug, Clone, Copy)]
pub struct SolverParams<T> {
    /// h²/(12K): converts V − E into the Numerov u.
    pub u_scale: T,
    pub u_max: T,
    pub tail_threshold: T,
    pub max_bisections: u32,
}

impl<T: Real> SolverParams<T> {
    #[must_use]
    pub fn new(config: &VibwaAlgorithmConfig) -> Self {
        let h = config.integration_step;
        Self {
            u_scale: T::from_f64(h * h / (12.0 * config.kinetic_factor())),
            u_max: T::from_f64(NUMEROV_FORBIDDEN_CLAMP),
            tail_threshold: T::from_f64(config.min_distance_to_asymptote),
            max_bisections: VIBWA_MAX_BISECTIONS,
        }
    }

    fn u(&self, v: T, energy: T) -> T {
        ((v - energy) * self.u_scale).min(self.u_max)
    }
}

/// Potential resampled onto the integration grid.
#[derive(Debug, Clone)]
pub struct IntegrationGrid<T> {
    pub r_min: f64,
    pub step: f64,
    pub potential: Vec<T>,
    pub minimum: T,
    pub minimum_index: usize,
    /// V at the last grid point, the upper end of every energy bracket.
    pub asymptote: T,
}

/// Number of integration points for a curve span, `None` when the span is
/// reversed or the count does not fit in `usize`.
#[must_use]
pub fn grid_len(min_r: f64, max_r: f64, step: f64) -> Option<usize> {
    let intervals = ((max_r - min_r) / step + 1e-9).floor();
    #[allow(clippy::cast_precision_loss)]
    let limit = usize::MAX as f64;
    if !intervals.is_finite() || intervals < 0.0 || intervals >= limit {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = intervals as usize;
    n.checked_add(1)
}

/// Host bytes of the integration grid of a span.
#[must_use]
pub fn grid_bytes(min_r: f64, max_r: f64, step: f64, scalar_size: u64) -> Option<u64> {
    let n = u64::try_from(grid_len(min_r, max_r, step)?).ok()?;
    n.checked_mul(scalar_size)
}

impl<T: Real> IntegrationGrid<T> {
    /// Interpolate a curve onto `r_min + k·step`, with the step of `config`.
    ///
    /// # Errors
    ///
    /// [`FailureReason::GridTooCoarse`] below three points or when
    /// h²·(V(r_max) − V_min)/(12K) exceeds [`NUMEROV_MAX_WELL_U`],
    /// [`FailureReason::NoWell`] when the minimum sits on a boundary.
    pub fn from_curve(
        curve: &DiscretizedCurve<T>,
        config: &VibwaAlgorithmConfig,
    ) -> Result<Self, FailureReason> {
        let step = config.integration_step;
        let n = grid_len(curve.min_r, curve.max_r, step).unwrap_or(0);
        if n < MIN_GRID_POINTS {
            return Err(FailureReason::GridTooCoarse);
        }
        let potential: Vec<T> = (0..n)
            .map(|k| curve.interpolate(curve.min_r + k as f64 * step))
            .collect();
        let (minimum_index, minimum) = potential
            .iter()
            .copied()
            .enumerate()
            .fold((0, potential[0]), |best, (k, v)| if v < best.1 { (k, v) } else { best });
        if minimum_index == 0 || minimum_index == n - 1 {
            return Err(FailureReason::NoWell);
        }
        let asymptote = potential[n - 1];
        let depth = (asymptote - minimum).to_f64();
        let u_top = depth * step * step / (12.0 * config.kinetic_factor());
        if u_top.is_nan() || u_top > NUMEROV_MAX_WELL_U {
            return Err(FailureReason::GridTooCoarse);
        }
        Ok(Self {
            r_min: curve.min_r,
            step,
            asymptote,
            potential,
            minimum,
            minimum_index,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.potential.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.potential.is_empty()
    }

    #[must_use]
    pub fn radius(&self, k: usize) -> f64 {
        self.r_min + k as f64 * self.step
    }

    /// Outermost grid index with V ≤ E, searching outward from the minimum.
    #[must_use]
    pub fn outer_turning_index(&self, energy: T) -> usize {
        (self.minimum_index..self.len())
            .take_while(|&k| self.potential[k] <= energy)
            .last()
            .unwrap_or(self.minimum_index)
    }

    /// Innermost grid index with V ≤ E, searching inward from the minimum.
    #[must_use]
    pub fn inner_turning_index(&self, energy: T) -> usize {
        (0..=self.minimum_index)
            .rev()
            .take_while(|&k| self.potential[k] <= energy)
            .last()
            .unwrap_or(self.minimum_index)
    }

    /// Classical turning points (inner, outer) in Å, linearly interpolated
    /// between the grid points that bracket V = E.
    #[must_use]
    pub fn turning_points(&self, energy: T) -> (f64, f64) {
        let e = energy.to_f64();
        let crossing = |inside: usize, outside: usize| {
            let v_in = self.potential[inside].to_f64();
            let v_out = self.potential[outside].to_f64();
            let (r_in, r_out) = (self.radius(inside), self.radius(outside));
            if v_out > v_in {
                r_in + (r_out - r_in) * (e - v_in) / (v_out - v_in)
            } else {
                r_in
            }
        };
        let inner = self.inner_turning_index(energy);
        let outer = self.outer_turning_index(energy);
        let r_inner = if inner > 0 { crossing(inner, inner - 1) } else { self.radius(0) };
        let r_outer = if outer + 1 < self.len() {
            crossing(outer, outer + 1)
        } else {
            self.radius(outer)
        };
        (r_inner, r_outer)
    }
}

/// A converged bound level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSolution<T> {
    pub energy: T,
    pub tail_amplitude: T,
}

/// Sign changes of the outward solution started from ψ(r_min) = 0.
#[must_use]
pub fn count_nodes<T: Real>(grid: &IntegrationGrid<T>, energy: T, params: &SolverParams<T>) -> u32 {
    let v = &grid.potential;
    let two = T::from_f64(2.0);
    let five = T::from_f64(5.0);
    let mut y0 = T::ZERO;
    let mut y1 = T::ONE;
    let mut u0 = params.u(v[0], energy);
    let mut u1 = params.u(v[1], energy);
    let mut nodes = 0;
    for k in 1..v.len() - 1 {
        let u2 = params.u(v[k + 1], energy);
        let mut y2 = (two * (T::ONE + five * u1) * y1 - (T::ONE - u0) * y0) / (T::ONE - u2);
        if (y2 < T::ZERO && y1 > T::ZERO) || (y2 > T::ZERO && y1 < T::ZERO) {
            nodes += 1;
        }
        if y2.abs() > T::RESCALE_LIMIT {
            y2 = y2 / T::RESCALE_LIMIT;
            y1 = y1 / T::RESCALE_LIMIT;
        }
        y0 = y1;
        y1 = y2;
        u0 = u1;
        u1 = u2;
    }
    nodes
}

/// Normalized |ψ(r_max)| of the matched solution at `energy`.
#[must_use]
pub fn tail_amplitude<T: Real>(
    grid: &IntegrationGrid<T>,
    energy: T,
    params: &SolverParams<T>,
) -> T {
    let v = &grid.potential;
    let n = v.len();
    let two = T::from_f64(2.0);
    let five = T::from_f64(5.0);
    let limit = T::RESCALE_LIMIT;
    let m = grid.outer_turning_index(energy).clamp(1, n - 2);

    // outward over 0..=m
    let mut y0 = T::ZERO;
    let mut y1 = T::ONE;
    let mut peak_out = T::ONE;
    let mut u0 = params.u(v[0], energy);
    let mut u1 = params.u(v[1], energy);
    for k in 1..m {
        let u2 = params.u(v[k + 1], energy);
        let mut y2 = (two * (T::ONE + five * u1) * y1 - (T::ONE - u0) * y0) / (T::ONE - u2);
        peak_out = peak_out.max(y2.abs());
        if y2.abs() > limit {
            y2 = y2 / limit;
            y1 = y1 / limit;
            peak_out = peak_out / limit;
        }
        y0 = y1;
        y1 = y2;
        u0 = u1;
        u1 = u2;
    }
    let y_m = y1;

    // inward over m..n-1 from ψ(n-1) = 1 against a node one step past r_max
    let mut z2 = T::ZERO;
    let mut z1 = T::ONE;
    let mut tail = T::ONE;
    let mut peak_in = T::ONE;
    let mut u2 = T::ZERO;
    let mut u1 = params.u(v[n - 1], energy);
    for k in (m..n - 1).rev() {
        let u0 = params.u(v[k], energy);
        let mut z0 = (two * (T::ONE + five * u1) * z1 - (T::ONE - u2) * z2) / (T::ONE - u0);
        peak_in = peak_in.max(z0.abs());
        if z0.abs() > limit {
            z0 = z0 / limit;
            z1 = z1 / limit;
            tail = tail / limit;
            peak_in = peak_in / limit;
        }
        z2 = z1;
        z1 = z0;
        u2 = u1;
        u1 = u0;
    }
    let z_m = z1;

    if y_m == T::ZERO || z_m == T::ZERO {
        return T::ONE;
    }
    let peak = (peak_out / y_m.abs()).max(peak_in / z_m.abs());
    (tail / z_m.abs()) / peak
}

/// Locate level `level` on `grid`.
///
/// # Errors
///
/// [`FailureReason::Unbound`], [`FailureReason::NoConvergence`] or
/// [`FailureReason::TailAboveThreshold`].
pub fn solve_level<T: Real>(
    grid: &IntegrationGrid<T>,
    level: u32,
    params: &SolverParams<T>,
) -> Result<LevelSolution<T>, FailureReason> {
    let mut lo = grid.minimum;
    let mut hi = grid.asymptote;
    if count_nodes(grid, hi, params) <= level {
        return Err(FailureReason::Unbound);
    }
    let half = T::from_f64(0.5);
    let tolerance = (hi - lo) * T::ENERGY_TOLERANCE;
    let mut converged = false;
    for _ in 0..params.max_bisections {
        let mid = (lo + hi) * half;
        if !mid.is_finite() {
            return Err(FailureReason::NoConvergence);
        }
        if mid <= lo || mid >= hi || hi - lo <= tolerance {
            converged = true;
            break;
        }
        if count_nodes(grid, mid, params) > level {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    if !converged {
        return Err(FailureReason::NoConvergence);
    }
    let energy = (lo + hi) * half;
    let tail = tail_amplitude(grid, energy, params);
    if !tail.is_finite() || tail >= params.tail_threshold {
        return Err(FailureReason::TailAboveThreshold {
            tail: tail.to_f64(),
            threshold: params.tail_threshold.to_f64(),
        });
    }
    Ok(LevelSolution {
        energy,
        tail_amplitude: tail,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::physics::morse::{MorseLevels, MorsePotentialConfig};

    fn algorithm(step: f64) -> VibwaAlgorithmConfig {
        VibwaAlgorithmConfig {
            mass_atom_0: 87.62,
            mass_atom_1: 87.62,
            integration_step: step,
            min_distance_to_asymptote: 0.1,
            min_level: 0,
            max_level: 3,
        }
    }

    fn sr2_curve<T: Real>(points: u32) -> (MorsePotentialConfig, DiscretizedCurve<T>) {
        let cfg = MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, points);
        let mut values = vec![T::ZERO; points as usize];
        cfg.sample_into(points, 0, &mut values);
        (
            cfg,
            DiscretizedCurve {
                min_r: cfg.min_r,
                max_r: cfg.max_r,
                values,
            },
        )
    }

    #[test]
    fn validation_rejects_reversed_range_and_bad_values() {
        assert!(algorithm(0.01).validate().is_ok());
        let reversed = VibwaAlgorithmConfig {
            min_level: 4,
            max_level: 2,
            ..algorithm(0.01)
        };
        assert!(matches!(
            reversed.validate(),
            Err(EngineError::InvalidAlgorithmSpec(msg)) if msg.contains("min_level")
        ));
        for bad in [
            VibwaAlgorithmConfig {
                integration_step: 0.0,
                ..algorithm(0.01)
            },
            VibwaAlgorithmConfig {
                mass_atom_1: -1.0,
                ..algorithm(0.01)
            },
            VibwaAlgorithmConfig {
                min_distance_to_asymptote: f64::NAN,
                ..algorithm(0.01)
            },
        ] {
            assert!(bad.validate().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn single_level_range_counts_one() {
        let a = VibwaAlgorithmConfig {
            min_level: 0,
            max_level: 0,
            ..algorithm(0.01)
        };
        assert_eq!(a.level_count(), 1);
    }

    #[test]
    fn full_u32_level_range_saturates_and_is_rejected() {
        let a = VibwaAlgorithmConfig {
            min_level: 0,
            max_level: u32::MAX,
            ..algorithm(0.01)
        };
        assert_eq!(a.level_count(), u32::MAX);
        assert!(matches!(
            a.validate(),
            Err(EngineError::InvalidAlgorithmSpec(msg)) if msg.contains("levels")
        ));

        let widest = VibwaAlgorithmConfig {
            min_level: 7,
            max_level: 6 + MAX_LEVELS_PER_CURVE,
            ..algorithm(0.01)
        };
        assert_eq!(widest.level_count(), MAX_LEVELS_PER_CURVE);
        assert!(widest.validate().is_ok());
        let top = VibwaAlgorithmConfig {
            min_level: u32::MAX,
            max_level: u32::MAX,
            ..algorithm(0.01)
        };
        assert_eq!(top.level_count(), 1);
    }

    #[test]
    fn grid_length_covers_span() {
        assert_eq!(grid_len(0.0, 10.0, 0.1), Some(101));
        assert_eq!(grid_len(0.0, 1.0, 0.3), Some(4));
        assert_eq!(grid_len(0.0, 0.1, 0.2), Some(1));
    }

    #[test]
    fn grid_length_refuses_unrepresentable_spans() {
        assert_eq!(grid_len(0.0, 10.0, 1e-300), None);
        assert_eq!(grid_len(0.0, f64::INFINITY, 0.1), None);
        assert_eq!(grid_len(5.0, 1.0, 0.1), None);
        assert_eq!(grid_bytes(1.5, 12.0, 0.005, 8), Some(2101 * 8));
        let huge = grid_bytes(1.5, 12.0, 1e-14, 8).unwrap();
        assert!(huge > 8_000_000_000_000_000, "{huge}");
        assert_eq!(grid_bytes(0.0, 1e300, 1e-10, 8), None);
    }

    #[test]
    fn node_count_is_monotonic_in_energy() {
        let (_, curve) = sr2_curve::<f64>(4001);
        let grid = IntegrationGrid::from_curve(&curve, &algorithm(0.005)).unwrap();
        let params = SolverParams::new(&algorithm(0.005));
        let mut last = 0;
        for i in 0..=50 {
            let e = grid.minimum + (grid.asymptote - grid.minimum) * f64::from(i) / 50.0;
            let n = count_nodes(&grid, e, &params);
            assert!(n >= last, "N({e}) = {n} < {last}");
            last = n;
        }
        assert_eq!(count_nodes(&grid, grid.minimum, &params), 0);
        assert!(last > 20, "most of the 28 Sr₂ levels resolved, got {last}");
    }

    #[test]
    fn f64_levels_match_analytic_morse() {
        let (cfg, curve) = sr2_curve::<f64>(4001);
        let alg = algorithm(0.005);
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let params = SolverParams::new(&alg);
        let exact = MorseLevels::new(&cfg, alg.kinetic_factor());
        for v in 0..4 {
            let sol = solve_level(&grid, v, &params).unwrap();
            let expected = exact.energy(v);
            let rel = ((sol.energy - grid.minimum) - expected).abs() / expected;
            assert!(rel < 1e-3, "v={v}: {} vs {expected} (rel {rel:.2e})", sol.energy);
            assert!(sol.tail_amplitude < 1e-6, "deep level has no tail");
        }
    }

    #[test]
    fn f32_levels_match_analytic_morse() {
        let (cfg, curve) = sr2_curve::<f32>(4001);
        let alg = algorithm(0.005);
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let params = SolverParams::<f32>::new(&alg);
        let exact = MorseLevels::new(&cfg, alg.kinetic_factor());
        let sol = solve_level(&grid, 0, &params).unwrap();
        let got = f64::from(sol.energy - grid.minimum);
        let rel = (got - exact.energy(0)).abs() / exact.energy(0);
        assert!(rel < 5e-3, "{got} vs {}", exact.energy(0));
    }

    #[test]
    fn levels_are_strictly_increasing() {
        let (_, curve) = sr2_curve::<f64>(4001);
        let alg = algorithm(0.005);
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let params = SolverParams::new(&alg);
        let energies: Vec<f64> = (0..6)
            .map(|v| solve_level(&grid, v, &params).unwrap().energy)
            .collect();
        assert!(energies.windows(2).all(|w| w[0] < w[1]), "{energies:?}");
    }

    #[test]
    fn level_above_asymptote_is_unbound() {
        let (cfg, curve) = sr2_curve::<f64>(4001);
        let alg = algorithm(0.005);
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let params = SolverParams::new(&alg);
        let bound = MorseLevels::new(&cfg, alg.kinetic_factor()).bound_levels;
        assert_eq!(solve_level(&grid, bound + 5, &params), Err(FailureReason::Unbound));
    }

    #[test]
    fn monotonic_curve_has_no_well() {
        let curve = DiscretizedCurve {
            min_r: 0.0,
            max_r: 1.0,
            values: (0..11).map(|i| 100.0 - f64::from(i)).collect(),
        };
        assert_eq!(
            IntegrationGrid::from_curve(&curve, &algorithm(0.1)).unwrap_err(),
            FailureReason::NoWell
        );
    }

    #[test]
    fn step_larger_than_span_is_too_coarse() {
        let (_, curve) = sr2_curve::<f64>(101);
        assert_eq!(
            IntegrationGrid::from_curve(&curve, &algorithm(20.0)).unwrap_err(),
            FailureReason::GridTooCoarse
        );
    }

    #[test]
    fn step_too_wide_for_the_well_is_too_coarse() {
        // Dₑ = 5500 cm⁻¹, a = 10 Å⁻¹: about 0.035 Å per wavelength at the well top
        let cfg = MorsePotentialConfig::new(5500.0, 0.6, 10.0, 0.0, 10.0, 16500);
        let mut values = vec![0.0_f64; 16500];
        cfg.sample_into(16500, 0, &mut values);
        let curve = DiscretizedCurve {
            min_r: cfg.min_r,
            max_r: cfg.max_r,
            values,
        };
        for step in [0.1, 0.05, 0.005] {
            assert_eq!(
                IntegrationGrid::from_curve(&curve, &algorithm(step)).unwrap_err(),
                FailureReason::GridTooCoarse,
                "h = {step}"
            );
        }

        let alg = VibwaAlgorithmConfig {
            max_level: 0,
            ..algorithm(0.001)
        };
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let sol = solve_level(&grid, 0, &SolverParams::new(&alg)).unwrap();
        let exact = MorseLevels::new(&cfg, alg.kinetic_factor()).energy(0);
        let rel = ((sol.energy - grid.minimum) - exact).abs() / exact;
        assert!(rel < 1e-3, "{} vs {exact}", sol.energy - grid.minimum);
    }

    #[test]
    fn sr2_grid_sits_well_inside_the_stability_bound() {
        let (_, curve) = sr2_curve::<f64>(4001);
        let alg = algorithm(0.005);
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let depth = grid.asymptote - grid.minimum;
        let u_top = depth * 0.005 * 0.005 / (12.0 * alg.kinetic_factor());
        assert!(u_top < NUMEROV_MAX_WELL_U / 5.0, "{u_top}");
        // 0.1 Å resolves neither Sr₂ nor anything deeper
        assert_eq!(
            IntegrationGrid::from_curve(&curve, &algorithm(0.1)).unwrap_err(),
            FailureReason::GridTooCoarse
        );
    }

    #[test]
    fn truncated_box_pushes_tail_over_threshold() {
        // Box ends just past the outer turning point of v = 0
        let cfg = MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 3.1, 1201);
        let mut values = vec![0.0_f64; 1201];
        cfg.sample_into(1201, 0, &mut values);
        let curve = DiscretizedCurve {
            min_r: cfg.min_r,
            max_r: cfg.max_r,
            values,
        };
        let alg = VibwaAlgorithmConfig {
            min_distance_to_asymptote: 1e-3,
            ..algorithm(0.001)
        };
        let grid = IntegrationGrid::from_curve(&curve, &alg).unwrap();
        let params = SolverParams::new(&alg);
        match solve_level(&grid, 0, &params) {
            Err(FailureReason::TailAboveThreshold { tail, .. }) => assert!(tail >= 1e-3),
            other => panic!("expected tail failure, got {other:?}"),
        }
    }

    #[test]
    fn turning_points_bracket_the_minimum() {
        let (_, curve) = sr2_curve::<f64>(4001);
        let grid = IntegrationGrid::from_curve(&curve, &algorithm(0.005)).unwrap();
        let e = grid.minimum + 100.0;
        let inner = grid.inner_turning_index(e);
        let outer = grid.outer_turning_index(e);
        assert!(inner < grid.minimum_index && grid.minimum_index < outer);
        assert!(grid.radius(inner) < 2.6 && grid.radius(outer) > 2.6);

        // V(r) = 100 on the Morse curve: 1 − e^{−a(r−rₑ)} = ±√0.2
        let (r_in, r_out) = grid.turning_points(e);
        let s = 0.2_f64.sqrt();
        let exact_in = 2.6 - (1.0 + s).ln() / 1.3;
        let exact_out = 2.6 - (1.0 - s).ln() / 1.3;
        assert!((r_in - exact_in).abs() < 1e-3, "{r_in} vs {exact_in}");
        assert!((r_out - exact_out).abs() < 1e-3, "{r_out} vs {exact_out}");
    }
}
