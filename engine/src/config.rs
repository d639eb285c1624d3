// SPDX-License-Identifier: AGPL-3.0-only

//! Engine settings read from the environment.
//!
//! | Variable | Behavior |
//! |----------|----------|
//! | `EPSEON_BACKEND` | `all` (default), `gpu`, `cpu`: device classes to enumerate |
//! | `EPSEON_WGPU_BACKEND` | `vulkan`, `metal`, `dx12`, `gl`; unset means all |
//! | `EPSEON_DEVICE` | `auto`, enumeration index, or name substring |
//! | `EPSEON_HOST_THREADS` | host pool size; `0` or unset lets rayon decide |

use crate::error::EngineError;
use epseon_forge::BackendSelection;

/// Environment-derived settings shared by the binaries and device binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub backend: BackendSelection,
    pub device_selector: String,
    /// Host pool threads, 0 for rayon's default.
    pub host_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendSelection::All,
            device_selector: String::from("auto"),
            host_threads: 0,
        }
    }
}

impl EngineConfig {
    /// Read all `EPSEON_*` variables.
    ///
    /// # Errors
    ///
    /// [`EngineError::Catalog`] for an unknown `EPSEON_BACKEND`, or
    /// [`EngineError::InvalidHardwareConfig`] for a non-numeric
    /// `EPSEON_HOST_THREADS`.
    pub fn from_env() -> Result<Self, EngineError> {
        let backend = BackendSelection::from_env()?;
        let device_selector = std::env::var("EPSEON_DEVICE").unwrap_or_else(|_| "auto".into());
        let host_threads = match std::env::var("EPSEON_HOST_THREADS") {
            Ok(v) => parse_threads(&v)?,
            Err(_) => 0,
        };
        Ok(Self {
            backend,
            device_selector,
            host_threads,
        })
    }
}

fn parse_threads(value: &str) -> Result<usize, EngineError> {
    value.trim().parse().map_err(|_| {
        EngineError::InvalidHardwareConfig(format!(
            "EPSEON_HOST_THREADS must be a thread count, got '{value}'"
        ))
    })
}

/// Install the `tracing` subscriber used by the binaries (`RUST_LOG` filter).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_auto_all() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.backend, BackendSelection::All);
        assert_eq!(cfg.device_selector, "auto");
        assert_eq!(cfg.host_threads, 0);
    }

    #[test]
    fn thread_count_parsing() {
        assert_eq!(parse_threads(" 8 ").unwrap(), 8);
        assert!(matches!(
            parse_threads("many"),
            Err(EngineError::InvalidHardwareConfig(msg)) if msg.contains("many")
        ));
    }
}
