// SPDX-License-Identifier: AGPL-3.0-only

//! Potential evaluation: turn a potential source into sampled curves.
//!
//! Each curve occupies one `potential_buffer_size` slab of the working
//! buffer. Curves are independent and evaluated in parallel; within a curve
//! the samples are computed in `group_size` chunks, mirroring the dispatch
//! grid the solver uses.

use crate::error::EngineError;
use crate::physics::morse::MorsePotentialConfig;
use crate::physics::potential_file::PotentialTable;
use crate::precision::Real;
use crate::task::HardwareConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Where the curves of a task come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialSource {
    /// Generated Morse curves, one per config.
    Morse(Vec<MorsePotentialConfig>),
    /// Two-column tables read at evaluation time.
    Files(Vec<PathBuf>),
}

impl PotentialSource {
    /// Number of curves the source produces.
    #[must_use]
    pub fn curve_count(&self) -> usize {
        match self {
            Self::Morse(configs) => configs.len(),
            Self::Files(paths) => paths.len(),
        }
    }
}

/// Evenly sampled potential over `[min_r, max_r]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizedCurve<T> {
    pub min_r: f64,
    pub max_r: f64,
    pub values: Vec<T>,
}

impl<T: Real> DiscretizedCurve<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample spacing.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        (self.max_r - self.min_r) / (self.len().saturating_sub(1).max(1)) as f64
    }

    /// Linear interpolation at `r`, clamped to the curve.
    #[must_use]
    pub fn interpolate(&self, r: f64) -> T {
        let last = self.len().saturating_sub(1);
        let t = ((r - self.min_r) / self.spacing()).max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = (t.floor() as usize).min(last.saturating_sub(1));
        let frac = T::from_f64((t - i as f64).min(1.0));
        let v0 = self.values[i];
        let v1 = self.values[(i + 1).min(last)];
        v0 + (v1 - v0) * frac
    }
}

/// Evaluate all curves of a source, in submission order.
///
/// When several curves fail, the lowest curve index is reported.
///
/// Must run inside the task's rayon pool (`pool.install`).
///
/// # Errors
///
/// [`EngineError::BufferTooSmall`] when a curve needs more samples than the
/// potential buffer holds, [`EngineError::PotentialLoad`] for unreadable
/// tables.
pub fn evaluate_curves<T: Real>(
    source: &PotentialSource,
    hardware: &HardwareConfig,
) -> Result<Vec<DiscretizedCurve<T>>, EngineError> {
    let capacity = u64::from(hardware.potential_buffer_size);
    let chunk = hardware.group_size as usize;
    match source {
        PotentialSource::Morse(configs) => configs
            .par_iter()
            .enumerate()
            .map(|(index, cfg)| -> Result<DiscretizedCurve<T>, EngineError> {
                let count = cfg.point_count.unwrap_or(hardware.potential_buffer_size);
                check_capacity(index, u64::from(count), capacity)?;
                let mut values = vec![T::ZERO; count as usize];
                values
                    .par_chunks_mut(chunk)
                    .enumerate()
                    .for_each(|(c, out)| cfg.sample_into(count, c * chunk, out));
                debug!(curve = index, points = count, "morse curve evaluated");
                Ok(DiscretizedCurve {
                    min_r: cfg.min_r,
                    max_r: cfg.max_r,
                    values,
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect(),
        PotentialSource::Files(paths) => paths
            .par_iter()
            .enumerate()
            .map(|(index, path)| -> Result<DiscretizedCurve<T>, EngineError> {
                let table = PotentialTable::load(path)?;
                check_capacity(index, table.len() as u64, capacity)?;
                let values = table
                    .resample(table.len())
                    .into_iter()
                    .map(T::from_f64)
                    .collect();
                debug!(
                    curve = index,
                    points = table.len(),
                    path = %path.display(),
                    "table curve loaded"
                );
                Ok(DiscretizedCurve {
                    min_r: table.min_r(),
                    max_r: table.max_r(),
                    values,
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect(),
    }
}

fn check_capacity(index: usize, required: u64, capacity: u64) -> Result<(), EngineError> {
    if required > capacity {
        return Err(EngineError::BufferTooSmall {
            potential_index: index,
            required,
            capacity,
        });
    }
    Ok(())
}

/// Lay curves out back to back in `potential_buffer_size` slabs.
#[must_use]
pub fn pack_curves<T: Real>(curves: &[DiscretizedCurve<T>], slab: usize) -> Vec<T> {
    let mut packed = vec![T::ZERO; curves.len() * slab];
    for (dst, curve) in packed.chunks_mut(slab).zip(curves) {
        dst[..curve.len()].copy_from_slice(&curve.values);
    }
    packed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hw(buffer: u32, group: u32) -> HardwareConfig {
        HardwareConfig::legacy(buffer, group, 1 << 20)
    }

    #[test]
    fn morse_curves_keep_submission_order() {
        let src = PotentialSource::Morse(vec![
            MorsePotentialConfig::new(500.0, 2.6, 1.3, 0.0, 10.0, 101),
            MorsePotentialConfig::new(5500.0, 0.6, 10.0, 0.0, 10.0, 51),
        ]);
        let curves = evaluate_curves::<f64>(&src, &hw(128, 16)).unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].len(), 101);
        assert_eq!(curves[1].len(), 51);
        let r = 2.6;
        let idx = 26; // r = 0.1 * 26
        assert!(
            (curves[0].values[idx] - 0.0).abs() < 1e-9,
            "minimum at rₑ: {}",
            curves[0].values[idx]
        );
        assert!(curves[0].values.iter().all(|v| *v >= 0.0));
        assert!((curves[0].interpolate(r)).abs() < 1e-9);
    }

    #[test]
    fn chunked_evaluation_matches_serial() {
        let cfg = MorsePotentialConfig::new(500.0, 2.6, 1.3, 0.5, 8.0, 97);
        let src = PotentialSource::Morse(vec![cfg]);
        let curves = evaluate_curves::<f64>(&src, &hw(100, 7)).unwrap();
        let mut serial = vec![0.0; 97];
        cfg.sample_into(97, 0, &mut serial);
        assert_eq!(curves[0].values, serial);
    }

    #[test]
    fn implicit_count_fills_the_buffer() {
        let cfg = MorsePotentialConfig::with_implicit_count(500.0, 2.6, 1.3, 0.0, 10.0);
        let src = PotentialSource::Morse(vec![cfg]);
        let curves = evaluate_curves::<f32>(&src, &hw(64, 32)).unwrap();
        assert_eq!(curves[0].len(), 64);
    }

    #[test]
    fn oversized_curve_reports_buffer_too_small() {
        let src = PotentialSource::Morse(vec![
            MorsePotentialConfig::new(500.0, 2.6, 1.3, 0.0, 10.0, 10),
            MorsePotentialConfig::new(500.0, 2.6, 1.3, 0.0, 10.0, 200),
        ]);
        let err = evaluate_curves::<f64>(&src, &hw(100, 10)).unwrap_err();
        assert_eq!(
            err,
            EngineError::BufferTooSmall {
                potential_index: 1,
                required: 200,
                capacity: 100
            }
        );
    }

    #[test]
    fn file_source_is_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.dat");
        std::fs::write(&path, "1.0 100\n1.5 20\n3.0 0\n4.0 60\n").unwrap();
        let src = PotentialSource::Files(vec![path]);
        let curves = evaluate_curves::<f64>(&src, &hw(16, 4)).unwrap();
        let c = &curves[0];
        assert_eq!(c.len(), 4);
        assert!((c.spacing() - 1.0).abs() < 1e-12);
        assert!((c.values[1] - 40.0 / 3.0).abs() < 1e-12, "2.0 lies between 20 and 0");
    }

    #[test]
    fn packing_pads_each_slab() {
        let a = DiscretizedCurve {
            min_r: 0.0,
            max_r: 1.0,
            values: vec![1.0_f32, 2.0, 3.0],
        };
        let b = DiscretizedCurve {
            min_r: 0.0,
            max_r: 1.0,
            values: vec![4.0_f32, 5.0],
        };
        assert_eq!(
            pack_curves(&[a, b], 4),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 0.0, 0.0]
        );
    }

    #[test]
    fn interpolation_clamps_outside_range() {
        let c = DiscretizedCurve {
            min_r: 1.0,
            max_r: 3.0,
            values: vec![10.0_f64, 0.0, 5.0],
        };
        assert!((c.interpolate(0.0) - 10.0).abs() < 1e-12);
        assert!((c.interpolate(1.5) - 5.0).abs() < 1e-12);
        assert!((c.interpolate(3.0) - 5.0).abs() < 1e-12);
        assert!((c.interpolate(9.0) - 5.0).abs() < 1e-12);
    }
}
