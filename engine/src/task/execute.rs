// SPDX-License-Identifier: AGPL-3.0-only

//! Task execution on the dispatch worker.
//!
//! ```text
//! evaluate curves (host pool) → integration grids (host pool)
//!   → solve slots (wgpu kernel, or host pool) → assemble in slot order
//! ```

use crate::error::{EngineError, FailureReason};
use crate::gpu::vibwa::{self as gpu_vibwa, SlotOutcome};
use crate::physics::potential::{evaluate_curves, DiscretizedCurve};
use crate::physics::vibwa::{grid_bytes, solve_level, IntegrationGrid, SolverParams};
use crate::precision::{Precision, Real};
use crate::task::configurator::TaskConfiguration;
use crate::task::handle::TaskRecord;
use crate::task::results::{PotentialLevels, TaskResults, VibrationalLevel};
use crate::task::scheduler::ExecutionContext;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

type Grid<T> = Result<IntegrationGrid<T>, FailureReason>;

/// Run a task to completion in its configured precision.
pub(crate) fn run_task(
    ctx: &ExecutionContext,
    config: &TaskConfiguration,
    record: &TaskRecord,
) -> Result<TaskResults, EngineError> {
    match config.precision {
        Precision::Float32 => run_typed::<f32>(ctx, config, record),
        Precision::Float64 => run_typed::<f64>(ctx, config, record),
    }
}

fn run_typed<T: Real>(
    ctx: &ExecutionContext,
    config: &TaskConfiguration,
    record: &TaskRecord,
) -> Result<TaskResults, EngineError> {
    let started = Instant::now();

    let (curves, grids) = ctx.pool.install(|| -> Result<_, EngineError> {
        let curves = evaluate_curves::<T>(&config.potential, &config.hardware)?;
        check_grid_sizes(&curves, config.algorithm.integration_step, ctx.max_buffer_size)?;
        let grids: Vec<Grid<T>> = curves
            .par_iter()
            .map(|c| IntegrationGrid::from_curve(c, &config.algorithm))
            .collect();
        Ok((curves, grids))
    })?;

    let gpu = ctx.gpu.as_ref().filter(|g| g.supports(T::PRECISION));
    let (outcomes, device) = match gpu {
        Some(gpu) => {
            let outcomes = gpu_vibwa::solve(gpu, &curves, &grids, config)?;
            record.advance(outcomes.len() as u64);
            (outcomes, gpu.adapter_name.clone())
        }
        None => {
            if let Some(gpu) = &ctx.gpu {
                warn!(
                    device = %gpu.adapter_name,
                    precision = %T::PRECISION,
                    "device lacks SHADER_F64, solving on the host pool"
                );
            }
            let outcomes = ctx.pool.install(|| solve_host(&grids, config, record));
            (outcomes, ctx.device_name.clone())
        }
    };

    let potentials = assemble(&curves, &grids, &outcomes, config)?;
    let wall_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(task = record.id(), wall_time_ms, "task solved");
    Ok(TaskResults {
        precision: T::PRECISION,
        device,
        wall_time_ms,
        potentials,
    })
}

/// Refuse grids larger than one device buffer before allocating them.
/// Tabulated spans are only known once the files are read.
fn check_grid_sizes<T: Real>(
    curves: &[DiscretizedCurve<T>],
    step: f64,
    limit: u64,
) -> Result<(), EngineError> {
    for curve in curves {
        let requested = grid_bytes(curve.min_r, curve.max_r, step, T::PRECISION.scalar_size())
            .unwrap_or(u64::MAX);
        if requested > limit {
            return Err(EngineError::OutOfDeviceMemory {
                requested,
                available: limit,
            });
        }
    }
    Ok(())
}

/// Host solve with the kernel's work partition: invocation `i` of the
/// `group_size × dispatch_count` grid handles slots `i, i + grid, …`.
pub(crate) fn solve_host<T: Real>(
    grids: &[Grid<T>],
    config: &TaskConfiguration,
    record: &TaskRecord,
) -> Vec<SlotOutcome<T>> {
    let params = &SolverParams::<T>::new(&config.algorithm);
    let n_levels = config.algorithm.level_count() as usize;
    let min_level = config.algorithm.min_level;
    let slots = grids.len() * n_levels;
    let grid_size = usize::try_from(config.hardware.grid_size())
        .unwrap_or(usize::MAX)
        .max(1);

    let mut solved: Vec<(usize, SlotOutcome<T>)> = (0..grid_size.min(slots))
        .into_par_iter()
        .flat_map_iter(|invocation| {
            (invocation..slots).step_by(grid_size).map(move |slot| {
                #[allow(clippy::cast_possible_truncation)]
                let level = min_level + (slot % n_levels) as u32;
                let outcome = match &grids[slot / n_levels] {
                    Ok(grid) => solve_level(grid, level, params),
                    Err(reason) => Err(*reason),
                };
                record.advance(1);
                (slot, outcome)
            })
        })
        .collect();
    solved.sort_unstable_by_key(|(slot, _)| *slot);
    solved.into_iter().map(|(_, outcome)| outcome).collect()
}

/// Group slot outcomes per potential; the first failing slot fails the task.
pub(crate) fn assemble<T: Real>(
    curves: &[DiscretizedCurve<T>],
    grids: &[Grid<T>],
    outcomes: &[SlotOutcome<T>],
    config: &TaskConfiguration,
) -> Result<Vec<PotentialLevels>, EngineError> {
    let n_levels = config.algorithm.level_count() as usize;
    let min_level = config.algorithm.min_level;
    let mut potentials = Vec::with_capacity(curves.len());

    for (potential_index, (grid, slot_outcomes)) in
        grids.iter().zip(outcomes.chunks(n_levels)).enumerate()
    {
        let mut levels = Vec::with_capacity(n_levels);
        for (offset, outcome) in slot_outcomes.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let level = min_level + offset as u32;
            let failure = |reason: FailureReason| EngineError::ConvergenceFailure {
                potential_index,
                level,
                reason,
            };
            let grid = grid.as_ref().map_err(|r| failure(*r))?;
            let solution = outcome.as_ref().map_err(|r| failure(*r))?;
            let (inner, outer) = grid.turning_points(solution.energy);
            levels.push(VibrationalLevel {
                level,
                energy: solution.energy.to_f64(),
                energy_above_minimum: (solution.energy - grid.minimum).to_f64(),
                inner_turning_point: inner,
                outer_turning_point: outer,
                tail_amplitude: solution.tail_amplitude.to_f64(),
            });
        }
        let (minimum_energy, asymptote) = match grid {
            Ok(g) => (g.minimum.to_f64(), g.asymptote.to_f64()),
            Err(_) => (f64::NAN, f64::NAN),
        };
        potentials.push(PotentialLevels {
            potential_index,
            minimum_energy,
            asymptote,
            levels,
        });
    }
    Ok(potentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::physics::morse::{MorseLevels, MorsePotentialConfig};
    use crate::physics::potential::PotentialSource;
    use crate::physics::vibwa::VibwaAlgorithmConfig;
    use crate::task::configurator::HardwareConfig;

    fn sr2(point_count: u32) -> MorsePotentialConfig {
        MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, point_count)
    }

    fn config(
        curves: Vec<MorsePotentialConfig>,
        min_level: u32,
        max_level: u32,
    ) -> TaskConfiguration {
        TaskConfiguration {
            precision: Precision::Float64,
            hardware: HardwareConfig::legacy(4096, 4, 1 << 12),
            potential: PotentialSource::Morse(curves),
            algorithm: VibwaAlgorithmConfig {
                mass_atom_0: 87.62,
                mass_atom_1: 87.62,
                integration_step: 0.005,
                min_distance_to_asymptote: 0.1,
                min_level,
                max_level,
            },
        }
    }

    fn grids_for(cfg: &TaskConfiguration) -> (Vec<DiscretizedCurve<f64>>, Vec<Grid<f64>>) {
        let curves = evaluate_curves::<f64>(&cfg.potential, &cfg.hardware).unwrap();
        let grids = curves
            .iter()
            .map(|c| IntegrationGrid::from_curve(c, &cfg.algorithm))
            .collect();
        (curves, grids)
    }

    fn record(slots: u64) -> TaskRecord {
        TaskRecord::new(0, "test".into(), Precision::Float64, slots)
    }

    #[test]
    fn small_grid_strides_over_all_slots() {
        // 2 curves × 4 levels on a 4 × 1024 grid, then on a 1 × 1 grid
        let mut cfg = config(vec![sr2(4001), sr2(4001)], 0, 3);
        let (_, grids) = grids_for(&cfg);
        let rec = record(8);
        let wide = solve_host(&grids, &cfg, &rec);
        let narrow_rec = record(8);
        cfg.hardware.group_size = 1;
        cfg.hardware.dispatch_count = 1;
        let narrow = solve_host(&grids, &cfg, &narrow_rec);
        assert_eq!(wide.len(), 8);
        assert_eq!(wide, narrow);
        assert_eq!(narrow_rec.completed(), 8);
    }

    #[test]
    fn assembled_levels_keep_order_and_match_morse() {
        let cfg = config(vec![sr2(4001), sr2(3001)], 1, 3);
        let (curves, grids) = grids_for(&cfg);
        let outcomes = solve_host(&grids, &cfg, &record(6));
        let potentials = assemble(&curves, &grids, &outcomes, &cfg).unwrap();
        assert_eq!(potentials.len(), 2);
        let exact = MorseLevels::new(&sr2(4001), cfg.algorithm.kinetic_factor());
        for (p, pot) in potentials.iter().enumerate() {
            assert_eq!(pot.potential_index, p);
            let levels: Vec<u32> = pot.levels.iter().map(|l| l.level).collect();
            assert_eq!(levels, vec![1, 2, 3]);
            for l in &pot.levels {
                let expected = exact.energy(l.level);
                let rel = (l.energy_above_minimum - expected).abs() / expected;
                assert!(rel < 1e-3, "p={p} v={}: rel {rel:.2e}", l.level);
                assert!(l.inner_turning_point < 2.6 && l.outer_turning_point > 2.6);
            }
        }
    }

    #[test]
    fn first_failing_slot_is_reported() {
        // curve 1 is fine, curve 2 has its minimum outside [min_r, max_r]
        let no_well = MorsePotentialConfig::new(500.0, 8.0, 1.3, 1.5, 6.0, 2001);
        let cfg = config(vec![sr2(4001), no_well], 0, 1);
        let (curves, grids) = grids_for(&cfg);
        let outcomes = solve_host(&grids, &cfg, &record(4));
        let err = assemble(&curves, &grids, &outcomes, &cfg).unwrap_err();
        assert_eq!(
            err,
            EngineError::ConvergenceFailure {
                potential_index: 1,
                level: 0,
                reason: FailureReason::NoWell
            }
        );
    }

    #[test]
    fn oversized_grid_is_refused_before_allocation() {
        let cfg = config(vec![sr2(4001)], 0, 0);
        let (curves, _) = grids_for(&cfg);
        assert!(check_grid_sizes(&curves, 0.005, 1 << 20).is_ok());
        assert_eq!(
            check_grid_sizes(&curves, 0.005, 1000).unwrap_err(),
            EngineError::OutOfDeviceMemory {
                requested: 2101 * 8,
                available: 1000
            }
        );
        assert_eq!(
            check_grid_sizes(&curves, 1e-300, 1 << 20).unwrap_err(),
            EngineError::OutOfDeviceMemory {
                requested: u64::MAX,
                available: 1 << 20
            }
        );
    }

    #[test]
    fn unbound_level_fails_with_its_index() {
        let cfg = config(vec![sr2(4001)], 40, 41);
        let (curves, grids) = grids_for(&cfg);
        let outcomes = solve_host(&grids, &cfg, &record(2));
        let err = assemble(&curves, &grids, &outcomes, &cfg).unwrap_err();
        assert_eq!(
            err,
            EngineError::ConvergenceFailure {
                potential_index: 0,
                level: 40,
                reason: FailureReason::Unbound
            }
        );
    }
}
