// SPDX-License-Identifier: AGPL-3.0-only

//! Dispatch routing: pick the device a workload should be bound to.
//!
//! Capability-based: we ask "who can do f64 shaders?" not "send to GPU #0".

use crate::substrate::{Capability, DeviceDescriptor, DeviceKind};

/// A workload that needs a device.
#[derive(Debug)]
pub struct Workload {
    pub name: String,
    pub required: Vec<Capability>,
    pub preferred_kind: Option<DeviceKind>,
}

/// Routing decision: which device was chosen and why.
#[derive(Debug)]
pub struct Decision<'a> {
    pub device: &'a DeviceDescriptor,
    pub reason: Reason,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Reason {
    /// The workload's preferred kind had all capabilities.
    Preferred,
    /// Best capable device by kind rank (discrete > integrated > virtual > other > CPU).
    BestAvailable,
}

impl Workload {
    #[must_use]
    pub fn new(name: impl Into<String>, required: Vec<Capability>) -> Self {
        Self {
            name: name.into(),
            required,
            preferred_kind: None,
        }
    }

    #[must_use]
    pub const fn prefer(mut self, kind: DeviceKind) -> Self {
        self.preferred_kind = Some(kind);
        self
    }
}

/// Route a workload to the best matching device.
///
/// Ties within a kind keep catalog order.
#[must_use]
pub fn route<'a>(workload: &Workload, devices: &'a [DeviceDescriptor]) -> Option<Decision<'a>> {
    let capable: Vec<&DeviceDescriptor> = devices
        .iter()
        .filter(|d| workload.required.iter().all(|req| d.has(*req)))
        .collect();

    if let Some(pref) = workload.preferred_kind {
        if let Some(d) = capable.iter().find(|d| d.kind == pref) {
            return Some(Decision {
                device: d,
                reason: Reason::Preferred,
            });
        }
    }

    let best = capable.iter().min_by_key(|d| d.kind.rank())?;
    Some(Decision {
        device: best,
        reason: Reason::BestAvailable,
    })
}

/// Capability requirements of the engine's workloads.
pub mod profiles {
    use super::Workload;
    use crate::substrate::{Capability, DeviceKind};

    /// Bound-state search in single precision.
    #[must_use]
    pub fn vibwa_f32() -> Workload {
        Workload::new("VIBWA f32", vec![Capability::F32Compute])
    }

    /// Bound-state search in double precision.
    #[must_use]
    pub fn vibwa_f64() -> Workload {
        Workload::new("VIBWA f64", vec![Capability::F64Compute])
    }

    /// Host reference run for validation against GPU output.
    #[must_use]
    pub fn host_reference() -> Workload {
        Workload::new("host reference", vec![Capability::F64Compute]).prefer(DeviceKind::Cpu)
    }
}
