// SPDX-License-Identifier: AGPL-3.0-only

//! Device execution of the VIBWA search.
//!
//! Curves are evaluated on the host and uploaded as `potential_buffer_size`
//! slabs; grid pre-checks (too coarse, no well) are also done on the host
//! and passed to the kernel as a per-curve status so those slots skip the
//! search. One dispatch of `dispatch_count` groups covers every slot.

use super::GpuDevice;
use crate::error::{EngineError, FailureReason};
use crate::physics::potential::{pack_curves, DiscretizedCurve};
use crate::physics::vibwa::{IntegrationGrid, LevelSolution, SolverParams};
use crate::precision::Real;
use crate::task::configurator::{TaskConfiguration, META_HEADER, OUTPUT_STRIDE, PARAM_HEADER};
use crate::tolerances::VIBWA_MAX_BISECTIONS;
use tracing::debug;

const KERNEL_TEMPLATE: &str = include_str!("shaders/vibwa.wgsl");

/// Outcome of one (curve, level) slot, in slot order.
pub(crate) type SlotOutcome<T> = Result<LevelSolution<T>, FailureReason>;

/// Specialize the kernel for a scalar type and group size.
#[must_use]
pub fn kernel_source<T: Real>(group_size: u32) -> String {
    KERNEL_TEMPLATE
        .replace("{{FP}}", T::PRECISION.wgsl_type())
        .replace("{{WG_SIZE}}", &group_size.to_string())
}

/// Host-side packing of the meta (u32) and params (FP) buffers.
pub(crate) fn pack_task<T: Real>(
    curves: &[DiscretizedCurve<T>],
    grids: &[Result<IntegrationGrid<T>, FailureReason>],
    config: &TaskConfiguration,
) -> (Vec<u32>, Vec<T>) {
    let hw = &config.hardware;
    let alg = &config.algorithm;
    let solver = SolverParams::<T>::new(alg);
    #[allow(clippy::cast_possible_truncation)]
    let mut meta = vec![
        curves.len() as u32,
        alg.level_count(),
        alg.min_level,
        config.slot_count() as u32,
        hw.grid_size().min(u64::from(u32::MAX)) as u32,
        VIBWA_MAX_BISECTIONS,
        hw.potential_buffer_size,
    ];
    let mut params = vec![
        T::from_f64(alg.integration_step),
        solver.u_scale,
        solver.tail_threshold,
        solver.u_max,
        T::ENERGY_TOLERANCE,
        T::RESCALE_LIMIT,
    ];
    debug_assert_eq!(meta.len() as u64, META_HEADER);
    debug_assert_eq!(params.len() as u64, PARAM_HEADER);

    for (curve, grid) in curves.iter().zip(grids) {
        #[allow(clippy::cast_possible_truncation)]
        let count = curve.len() as u32;
        match grid {
            Ok(g) => {
                #[allow(clippy::cast_possible_truncation)]
                let (len, vmin_index) = (g.len() as u32, g.minimum_index as u32);
                meta.extend([count, len, 0, vmin_index]);
                params.extend([
                    T::from_f64(curve.min_r),
                    T::from_f64(curve.max_r),
                    g.minimum,
                    g.asymptote,
                ]);
            }
            Err(reason) => {
                meta.extend([count, 0, reason.code(), 0]);
                params.extend([
                    T::from_f64(curve.min_r),
                    T::from_f64(curve.max_r),
                    T::ZERO,
                    T::ZERO,
                ]);
            }
        }
    }
    (meta, params)
}

/// Decode one output triple.
pub(crate) fn decode_slot<T: Real>(
    energy: T,
    tail: T,
    status: T,
    threshold: f64,
) -> SlotOutcome<T> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let code = status.to_f64().round() as u32;
    match code {
        0 => Ok(LevelSolution {
            energy,
            tail_amplitude: tail,
        }),
        1 => Err(FailureReason::NoWell),
        2 => Err(FailureReason::Unbound),
        3 => Err(FailureReason::TailAboveThreshold {
            tail: tail.to_f64(),
            threshold,
        }),
        5 => Err(FailureReason::GridTooCoarse),
        _ => Err(FailureReason::NoConvergence),
    }
}

/// Run every slot of the task on `gpu`.
///
/// # Errors
///
/// [`EngineError::GpuCompute`] if the readback fails or returns a short
/// buffer.
pub(crate) fn solve<T: Real>(
    gpu: &GpuDevice,
    curves: &[DiscretizedCurve<T>],
    grids: &[Result<IntegrationGrid<T>, FailureReason>],
    config: &TaskConfiguration,
) -> Result<Vec<SlotOutcome<T>>, EngineError> {
    let hw = &config.hardware;
    let slots = usize::try_from(config.slot_count())
        .map_err(|_| EngineError::GpuCompute("slot count exceeds address space".into()))?;
    let (meta, params) = pack_task(curves, grids, config);
    let packed = pack_curves(curves, hw.potential_buffer_size as usize);

    let pipeline = gpu.create_pipeline(&kernel_source::<T>(hw.group_size), "vibwa");
    let meta_buf = gpu.create_storage_buffer(&meta, "vibwa_meta");
    let curve_buf = gpu.create_storage_buffer(&packed, "vibwa_curves");
    let param_buf = gpu.create_storage_buffer(&params, "vibwa_params");
    let out_buf = gpu.create_output_buffer(
        config.slot_count() * OUTPUT_STRIDE * config.precision.scalar_size(),
        "vibwa_output",
    );
    let bind_group =
        gpu.create_bind_group(&pipeline, &[&meta_buf, &curve_buf, &param_buf, &out_buf]);

    debug!(slots, groups = hw.dispatch_count, group_size = hw.group_size, "vibwa dispatch");
    let raw: Vec<T> = gpu.dispatch_and_read(&pipeline, &bind_group, hw.dispatch_count, &out_buf)?;
    if raw.len() < slots * 3 {
        return Err(EngineError::GpuCompute(format!(
            "readback returned {} values, expected {}",
            raw.len(),
            slots * 3
        )));
    }
    let threshold = config.algorithm.min_distance_to_asymptote;
    Ok(raw
        .chunks_exact(3)
        .take(slots)
        .map(|s| decode_slot(s[0], s[1], s[2], threshold))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::physics::morse::MorsePotentialConfig;
    use crate::physics::potential::PotentialSource;
    use crate::physics::vibwa::VibwaAlgorithmConfig;
    use crate::precision::Precision;
    use crate::task::configurator::HardwareConfig;

    fn config(precision: Precision, curves: usize) -> TaskConfiguration {
        TaskConfiguration {
            precision,
            hardware: HardwareConfig::legacy(512, 64, 4096),
            potential: PotentialSource::Morse(vec![
                MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, 512);
                curves
            ]),
            algorithm: VibwaAlgorithmConfig {
                mass_atom_0: 87.62,
                mass_atom_1: 87.62,
                integration_step: 0.01,
                min_distance_to_asymptote: 0.1,
                min_level: 2,
                max_level: 4,
            },
        }
    }

    #[test]
    fn kernel_is_specialized() {
        let f32_src = kernel_source::<f32>(64);
        assert!(f32_src.contains("alias FP = f32;"));
        assert!(f32_src.contains("@workgroup_size(64)"));
        assert!(!f32_src.contains("{{"));
        let f64_src = kernel_source::<f64>(128);
        assert!(f64_src.contains("alias FP = f64;"));
        assert!(f64_src.contains("nwg.x * 128u"));
    }

    #[test]
    fn packed_layout_matches_headers() {
        let cfg = config(Precision::Float64, 2);
        let curve = DiscretizedCurve {
            min_r: 1.5,
            max_r: 12.0,
            values: vec![0.0_f64; 512],
        };
        let grids = vec![Err(FailureReason::NoWell), Err(FailureReason::GridTooCoarse)];
        let (meta, params) = pack_task(&[curve.clone(), curve], &grids, &cfg);
        assert_eq!(meta.len() as u64, META_HEADER + 8);
        assert_eq!(params.len() as u64, PARAM_HEADER + 8);
        assert_eq!(&meta[..4], &[2, 3, 2, 6]);
        assert_eq!(meta[4], 512);
        assert_eq!(meta[6], 512);
        assert_eq!(meta[7 + 2], FailureReason::NoWell.code());
        assert_eq!(meta[11 + 2], FailureReason::GridTooCoarse.code());
        assert!((params[0] - 0.01).abs() < 1e-15);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn status_codes_round_trip_through_decode() {
        assert_eq!(
            decode_slot(12.5_f32, 1e-9, 0.0, 0.1),
            Ok(LevelSolution {
                energy: 12.5,
                tail_amplitude: 1e-9
            })
        );
        let reasons = [
            FailureReason::NoWell,
            FailureReason::Unbound,
            FailureReason::TailAboveThreshold {
                tail: 0.5,
                threshold: 0.1,
            },
            FailureReason::NoConvergence,
            FailureReason::GridTooCoarse,
        ];
        for reason in reasons {
            let status = f64::from(reason.code());
            assert_eq!(decode_slot(0.0_f64, 0.5, status, 0.1), Err(reason));
        }
    }
}
