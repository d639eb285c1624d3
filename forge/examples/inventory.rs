// SPDX-License-Identifier: AGPL-3.0-only

//! Discover and print all compute devices and the routing of the engine's
//! workloads on this machine.

use epseon_forge::dispatch::{self, profiles};
use epseon_forge::inventory::{print_inventory, DeviceCatalog};
use epseon_forge::substrate::{Capability, DeviceKind};
use std::process;

fn main() {
    let catalog = match DeviceCatalog::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  enumeration failed: {e}");
            process::exit(1);
        }
    };
    print_inventory(&catalog);

    println!();
    println!("═══ Dispatch Routing ═══════════════════════════════════════");
    for work in [
        profiles::vibwa_f32(),
        profiles::vibwa_f64(),
        profiles::host_reference(),
    ] {
        match dispatch::route(&work, catalog.devices()) {
            Some(d) => println!("  {:20} → {} ({:?})", work.name, d.device, d.reason),
            None => println!("  {:20} → NO CAPABLE DEVICE", work.name),
        }
    }

    println!();
    let f64_gpus: Vec<_> = catalog
        .iter()
        .filter(|d| d.kind != DeviceKind::Cpu && d.has(Capability::F64Compute))
        .collect();
    println!("  Native f64 GPUs: {}", f64_gpus.len());
    for g in &f64_gpus {
        println!("    - {}", g.name);
    }
    match catalog.select_from_env() {
        Ok(d) => println!("  EPSEON_DEVICE selects: {d}"),
        Err(e) => println!("  EPSEON_DEVICE: {e}"),
    }
}
