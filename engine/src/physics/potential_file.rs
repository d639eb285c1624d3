// SPDX-License-Identifier: AGPL-3.0-only

//! Tabulated potential curves.
//!
//! Plain text, one `r V` pair per line (whitespace separated), `#` starts a
//! comment. Radii must be strictly increasing. Tables are resampled onto an
//! evenly spaced grid with the same number of points so they flow through
//! the same buffers as generated Morse curves.

use crate::error::EngineError;
use crate::tolerances::MIN_CURVE_POINTS;
use std::fs;
use std::path::Path;

/// A tabulated curve as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialTable {
    pub radii: Vec<f64>,
    pub values: Vec<f64>,
}

impl PotentialTable {
    /// Read and parse a table file.
    ///
    /// # Errors
    ///
    /// [`EngineError::PotentialLoad`] on IO or parse errors.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| load_error(path, e.to_string()))?;
        Self::parse(&text).map_err(|reason| load_error(path, reason))
    }

    /// Parse table text; errors carry the 1-based line number.
    ///
    /// # Errors
    ///
    /// Returns the reason as a string.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut radii = Vec::new();
        let mut values = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let mut cols = content.split_whitespace();
            let (Some(r), Some(v), None) = (cols.next(), cols.next(), cols.next()) else {
                return Err(format!("line {}: expected two columns", lineno + 1));
            };
            let r: f64 = r
                .parse()
                .map_err(|_| format!("line {}: bad radius '{r}'", lineno + 1))?;
            let v: f64 = v
                .parse()
                .map_err(|_| format!("line {}: bad energy '{v}'", lineno + 1))?;
            if !r.is_finite() || !v.is_finite() {
                return Err(format!("line {}: non-finite value", lineno + 1));
            }
            if radii.last().is_some_and(|&prev| r <= prev) {
                return Err(format!("line {}: radii must be strictly increasing", lineno + 1));
            }
            radii.push(r);
            values.push(v);
        }
        if radii.len() < MIN_CURVE_POINTS as usize {
            return Err(format!(
                "need at least {MIN_CURVE_POINTS} rows, found {}",
                radii.len()
            ));
        }
        Ok(Self { radii, values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.radii.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    #[must_use]
    pub fn min_r(&self) -> f64 {
        self.radii.first().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn max_r(&self) -> f64 {
        self.radii.last().copied().unwrap_or(0.0)
    }

    /// Linear interpolation at `r`, clamped to the table range.
    #[must_use]
    pub fn interpolate(&self, r: f64) -> f64 {
        let idx = self.radii.partition_point(|&x| x <= r);
        if idx == 0 {
            return self.values[0];
        }
        if idx >= self.len() {
            return self.values[self.len() - 1];
        }
        let (r0, r1) = (self.radii[idx - 1], self.radii[idx]);
        let (v0, v1) = (self.values[idx - 1], self.values[idx]);
        v0 + (v1 - v0) * (r - r0) / (r1 - r0)
    }

    /// Evenly spaced resampling over `[min_r, max_r]` with `count` points.
    #[must_use]
    pub fn resample(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = (self.min_r(), self.max_r());
        let dr = (hi - lo) / (count.saturating_sub(1).max(1)) as f64;
        (0..count).map(|i| self.interpolate(lo + i as f64 * dr)).collect()
    }
}

fn load_error(path: &Path, reason: String) -> EngineError {
    EngineError::PotentialLoad {
        path: path.display().to_string(),
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TABLE: &str = "# r/Å  V/cm^-1\n1.0 100.0\n2.0 0.0   # minimum\n\n3.0 50.0\n4.0 80.0\n";

    #[test]
    fn parses_with_comments_and_blank_lines() {
        let t = PotentialTable::parse(TABLE).unwrap();
        assert_eq!(t.radii, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.values[1], 0.0);
    }

    #[test]
    fn rejects_non_monotonic_radii() {
        let err = PotentialTable::parse("1 0\n3 1\n2 2\n").unwrap_err();
        assert!(err.contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_short_and_malformed_tables() {
        assert!(PotentialTable::parse("1 0\n2 1\n").is_err());
        assert!(PotentialTable::parse("1 0 5\n2 1\n3 4\n").is_err());
        assert!(PotentialTable::parse("1 x\n2 1\n3 4\n").is_err());
    }

    #[test]
    fn interpolation_and_resampling() {
        let t = PotentialTable::parse(TABLE).unwrap();
        assert!((t.interpolate(1.5) - 50.0).abs() < 1e-12);
        assert!((t.interpolate(0.0) - 100.0).abs() < 1e-12);
        let s = t.resample(7);
        assert_eq!(s.len(), 7);
        assert!((s[0] - 100.0).abs() < 1e-12);
        assert!((s[2] - 0.0).abs() < 1e-12);
        assert!((s[6] - 80.0).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = PotentialTable::load(Path::new("/nonexistent/curve.dat")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::PotentialLoad { ref path, .. } if path.contains("curve.dat")
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dat");
        std::fs::write(&path, TABLE).unwrap();
        let t = PotentialTable::load(&path).unwrap();
        assert_eq!(t.len(), 4);
    }
}
