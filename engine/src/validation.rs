// SPDX-License-Identifier: AGPL-3.0-only

//! Pass/fail bookkeeping for the validation binary.
//!
//! Checks compare an observed value against a reference with a tolerance
//! from [`crate::tolerances`]. The binary prints a summary and exits 0 only
//! if every check passed.

use serde::Serialize;
use std::fmt;
use std::process;

/// One recorded check.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub mode: ToleranceMode,
}

/// How a tolerance is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// |observed − expected| < tolerance
    Absolute,
    /// |observed − expected| / |expected| < tolerance
    Relative,
    /// observed < tolerance
    UpperBound,
    /// Plain boolean outcome.
    Boolean,
}

impl fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absolute => "abs",
            Self::Relative => "rel",
            Self::UpperBound => "<",
            Self::Boolean => "bool",
        })
    }
}

/// Accumulates checks for one validation run.
#[derive(Debug, Default, Serialize)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: ToleranceMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Absolute);
    }

    /// Relative check; falls back to absolute when `expected` is zero.
    /// NaN never passes.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > f64::EPSILON {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Relative);
    }

    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::UpperBound,
        );
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            ToleranceMode::Boolean,
        );
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Summary block printed by [`Self::finish`].
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print the summary (and the failed labels) and exit 0 or 1.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn harness_tracks_pass_fail() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("exact", 1.0, 1.0, 1e-10);
        h.check_abs("close", 1.0001, 1.0, 1e-3);
        h.check_abs("far", 2.0, 1.0, 1e-3);
        assert_eq!(h.passed_count(), 2);
        assert_eq!(h.total_count(), 3);
        assert!(!h.all_passed());
    }

    #[test]
    fn relative_check_handles_zero_and_nan() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("near_zero", 1e-15, 0.0, 1e-10);
        h.check_rel("nan", f64::NAN, 1.0, 1e-3);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn level_energy_within_relative_tolerance() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("v=0", 14.82, 14.8235, 1e-3);
        h.check_rel("v=0 wrong sign", -14.82, 14.8235, 1e-3);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn upper_bound_is_strict() {
        let mut h = ValidationHarness::new("test");
        h.check_upper("below", 0.5, 1.0);
        h.check_upper("at", 1.0, 1.0);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn summary_counts_and_names() {
        let mut h = ValidationHarness::new("vibwa");
        h.check_bool("ok", true);
        h.check_bool("broken", false);
        let s = h.summary();
        assert!(s.contains("vibwa validation: 1/2"));
        assert!(s.contains("✗ broken"));
        assert!(s.contains("(bool)"));
    }

    #[test]
    fn empty_harness_passes_vacuously() {
        assert!(ValidationHarness::new("empty").all_passed());
    }

    #[test]
    fn checks_serialize_for_reports() {
        let mut h = ValidationHarness::new("vibwa");
        h.check_upper("tail", 1e-6, 1e-3);
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["checks"][0]["mode"], "upper_bound");
        assert_eq!(json["name"], "vibwa");
    }
}
