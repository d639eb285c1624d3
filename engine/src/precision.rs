// SPDX-License-Identifier: AGPL-3.0-only

//! Floating-point precision of a task.
//!
//! Fixed when the configurator is created and carried through potential
//! evaluation, the solver and the device kernel. [`Real`] is the scalar
//! abstraction the host code is generic over.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Precision token accepted by `get_task_configurator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
}

impl FromStr for Precision {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            other => Err(EngineError::InvalidPrecision(other.to_string())),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Precision {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Bytes per scalar.
    #[must_use]
    pub const fn scalar_size(self) -> u64 {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// WGSL scalar type name.
    #[must_use]
    pub const fn wgsl_type(self) -> &'static str {
        match self {
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        }
    }
}

/// Scalar type the solver runs in.
pub trait Real:
    Copy
    + Send
    + Sync
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + bytemuck::Pod
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const PRECISION: Precision;

    /// Magnitude at which integrated wavefunctions are rescaled.
    const RESCALE_LIMIT: Self;

    /// Relative width at which an energy bracket counts as collapsed.
    const ENERGY_TOLERANCE: Self;

    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    fn abs(self) -> Self;
    fn exp(self) -> Self;
    fn is_finite(self) -> bool;

    #[must_use]
    fn max(self, other: Self) -> Self {
        if self > other {
            self
        } else {
            other
        }
    }

    #[must_use]
    fn min(self, other: Self) -> Self {
        if self < other {
            self
        } else {
            other
        }
    }
}

macro_rules! impl_real {
    ($t:ty, $precision:expr, $limit:expr, $tol:expr) => {
        impl Real for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const PRECISION: Precision = $precision;
            const RESCALE_LIMIT: Self = $limit;
            const ENERGY_TOLERANCE: Self = $tol;

            #[allow(clippy::cast_possible_truncation)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn to_f64(self) -> f64 {
                f64::from(self)
            }

            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            fn is_finite(self) -> bool {
                <$t>::is_finite(self)
            }
        }
    };
}

impl_real!(f32, Precision::Float32, 1e15, 1e-6);
impl_real!(f64, Precision::Float64, 1e150, 1e-12);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for p in [Precision::Float32, Precision::Float64] {
            assert_eq!(p.token().parse::<Precision>().unwrap(), p);
        }
    }

    #[test]
    fn unsupported_token_is_named_in_error() {
        let err = "float80".parse::<Precision>().unwrap_err();
        assert!(err.to_string().contains("\"float80\""));
        assert!("Float32".parse::<Precision>().is_err(), "tokens are case-sensitive");
    }

    #[test]
    fn scalar_sizes_match_types() {
        assert_eq!(Precision::Float32.scalar_size(), std::mem::size_of::<f32>() as u64);
        assert_eq!(Precision::Float64.scalar_size(), std::mem::size_of::<f64>() as u64);
    }

    #[test]
    fn real_precision_constants() {
        assert_eq!(<f32 as Real>::PRECISION, Precision::Float32);
        assert_eq!(<f64 as Real>::PRECISION, Precision::Float64);
        assert!(<f32 as Real>::RESCALE_LIMIT.to_f64() * 16.0 < f64::from(f32::MAX));
    }

    #[test]
    fn serde_uses_tokens() {
        let json = serde_json::to_string(&Precision::Float64).unwrap();
        assert_eq!(json, "\"float64\"");
    }
}
