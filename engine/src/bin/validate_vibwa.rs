// SPDX-License-Identifier: AGPL-3.0-only

//! VIBWA validation against closed-form Morse levels.
//!
//! Validates, in float64 and float32:
//!   1. Level energies above the minimum match E_v = ωₑ(v+½) − ωₑxₑ(v+½)²
//!   2. Levels increase strictly with v
//!   3. Turning points bracket rₑ
//!   4. Tail amplitudes stay below the configured threshold
//!   5. When the selected device is a GPU, its energies match the host pool
//!
//! Exit code 0 = all checks pass, 1 = any failure.

use epseon_engine::physics::{MorseLevels, MorsePotentialConfig, VibwaAlgorithmConfig};
use epseon_engine::tolerances::{GPU_VS_HOST_REL, MORSE_LEVEL_REL_F32, MORSE_LEVEL_REL_F64};
use epseon_engine::validation::ValidationHarness;
use epseon_engine::{
    init_tracing, DeviceCatalog, DeviceInterface, EngineConfig, EngineError, HardwareConfig,
    Precision, TaskResults,
};
use epseon_forge::substrate::HOST_DEVICE_ID;
use std::process;
use std::sync::Arc;
use tracing::error;

const CURVE: MorsePotentialConfig = MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, 4001);

const ALGORITHM: VibwaAlgorithmConfig = VibwaAlgorithmConfig {
    mass_atom_0: 87.62,
    mass_atom_1: 87.62,
    integration_step: 0.005,
    min_distance_to_asymptote: 0.1,
    min_level: 0,
    max_level: 9,
};

fn solve(iface: &DeviceInterface, precision: Precision) -> Result<Arc<TaskResults>, EngineError> {
    let mut configurator = iface.get_task_configurator(precision.token())?;
    configurator
        .set_hardware_config(HardwareConfig::new(4096, 64, 64, 1 << 16))?
        .set_morse_potential(vec![CURVE])?
        .set_vibwa_algorithm(ALGORITHM)?;
    iface.submit_task(&configurator)?.wait(None)
}

fn check_against_morse(
    harness: &mut ValidationHarness,
    precision: Precision,
    results: &TaskResults,
) {
    let exact = MorseLevels::new(&CURVE, ALGORITHM.kinetic_factor());
    let tol = match precision {
        Precision::Float32 => MORSE_LEVEL_REL_F32,
        Precision::Float64 => MORSE_LEVEL_REL_F64,
    };
    let Some(pot) = results.potentials.first() else {
        harness.check_bool(&format!("{precision}: one potential returned"), false);
        return;
    };
    harness.check_bool(
        &format!("{precision}: all requested levels returned"),
        pot.levels.len() == ALGORITHM.level_count() as usize,
    );

    for lvl in &pot.levels {
        let expected = exact.energy(lvl.level);
        let observed = lvl.energy_above_minimum;
        println!(
            "    v={:<2} {observed:>12.6} vs {expected:>12.6} cm⁻¹ (err {:.2e})",
            lvl.level,
            ((observed - expected) / expected).abs()
        );
        harness.check_rel(
            &format!("{precision}: E_{} vs Morse", lvl.level),
            observed,
            expected,
            tol,
        );
        harness.check_upper(
            &format!("{precision}: tail v={}", lvl.level),
            lvl.tail_amplitude,
            ALGORITHM.min_distance_to_asymptote,
        );
        harness.check_bool(
            &format!("{precision}: turning points v={} bracket rₑ", lvl.level),
            lvl.inner_turning_point < CURVE.equilibrium_bond_distance
                && lvl.outer_turning_point > CURVE.equilibrium_bond_distance,
        );
    }
    harness.check_bool(
        &format!("{precision}: levels strictly increasing"),
        pot.levels.windows(2).all(|w| w[1].energy > w[0].energy),
    );
}

fn check_against_host(
    harness: &mut ValidationHarness,
    precision: Precision,
    device: &TaskResults,
    host: &TaskResults,
) {
    let pairs = device
        .potentials
        .iter()
        .zip(&host.potentials)
        .flat_map(|(d, h)| d.levels.iter().zip(&h.levels));
    for (d, h) in pairs {
        harness.check_rel(
            &format!("{precision}: E_{} {} vs host", d.level, device.device),
            d.energy,
            h.energy,
            GPU_VS_HOST_REL,
        );
    }
}

fn run(harness: &mut ValidationHarness) -> Result<(), EngineError> {
    let config = EngineConfig::from_env()?;
    let catalog = DeviceCatalog::enumerate(config.backend)?;
    let iface = DeviceInterface::bind_default(&catalog, &config)?;
    let host = if iface.descriptor().id == HOST_DEVICE_ID {
        None
    } else {
        catalog
            .find(HOST_DEVICE_ID)
            .ok()
            .map(|_| DeviceInterface::bind(&catalog, HOST_DEVICE_ID))
            .transpose()?
    };
    println!("  device: {}", iface.descriptor());

    for precision in [Precision::Float64, Precision::Float32] {
        println!("  ── {precision} ──");
        let results = match solve(&iface, precision) {
            Ok(r) => r,
            Err(e) => {
                println!("    task failed: {e}");
                harness.check_bool(&format!("{precision}: task completed"), false);
                continue;
            }
        };
        harness.check_bool(&format!("{precision}: task completed"), true);
        check_against_morse(harness, precision, &results);

        if let Some(host) = &host {
            if iface.runs_natively(precision) {
                let reference = solve(host, precision)?;
                check_against_host(harness, precision, &results, &reference);
            }
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  VIBWA validation: Sr₂ Morse curve, v = 0..9                 ║");
    println!("║  Dₑ = 500 cm⁻¹, rₑ = 2.6 Å, a = 1.3 Å⁻¹, h = 0.005 Å         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut harness = ValidationHarness::new("vibwa");
    if let Err(e) = run(&mut harness) {
        error!("{e}");
        process::exit(1);
    }
    harness.finish();
}
