// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: tabulated potentials read from disk.

use epseon_engine::physics::{MorseLevels, MorsePotentialConfig, VibwaAlgorithmConfig};
use epseon_engine::{DeviceCatalog, DeviceInterface, EngineError, HardwareConfig, TaskResults};
use epseon_forge::probe::probe_cpu;
use epseon_forge::substrate::HOST_DEVICE_ID;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn algorithm() -> VibwaAlgorithmConfig {
    VibwaAlgorithmConfig {
        mass_atom_0: 87.62,
        mass_atom_1: 87.62,
        integration_step: 0.005,
        min_distance_to_asymptote: 0.1,
        min_level: 0,
        max_level: 4,
    }
}

/// Tabulate `curve` at its own sample count into a temp file.
fn morse_table(curve: &MorsePotentialConfig) -> NamedTempFile {
    let n = curve.point_count.expect("explicit count");
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "# r [Å]   V [cm⁻¹]").expect("write");
    let step = (curve.max_r - curve.min_r) / f64::from(n - 1);
    for i in 0..n {
        let r = curve.min_r + step * f64::from(i);
        writeln!(file, "{r:.10} {:.10}", curve.value(r)).expect("write");
    }
    file.flush().expect("flush");
    file
}

fn run_files(paths: Vec<PathBuf>) -> Result<Arc<TaskResults>, EngineError> {
    run_files_with(paths, algorithm())
}

fn run_files_with(
    paths: Vec<PathBuf>,
    algorithm: VibwaAlgorithmConfig,
) -> Result<Arc<TaskResults>, EngineError> {
    let catalog = DeviceCatalog::from_devices(vec![probe_cpu()], wgpu::Backends::empty());
    let iface = DeviceInterface::bind(&catalog, HOST_DEVICE_ID)?;
    let mut cfg = iface.get_task_configurator("float64")?;
    cfg.set_hardware_config(HardwareConfig::new(4096, 64, 64, 1 << 16))?
        .set_potential_files(paths)?
        .set_vibwa_algorithm(algorithm)?;
    iface.submit_task(&cfg)?.wait(Some(Duration::from_secs(120)))
}

#[test]
fn tabulated_morse_matches_closed_form() {
    let curve = MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, 4001);
    let table = morse_table(&curve);
    let results = run_files(vec![table.path().to_path_buf()]).expect("task");
    let exact = MorseLevels::new(&curve, algorithm().kinetic_factor());
    let pot = &results.potentials[0];
    assert_eq!(pot.levels.len(), 5);
    assert!(pot.minimum_energy.abs() < 1.0, "minimum {}", pot.minimum_energy);
    for lvl in &pot.levels {
        let e = exact.energy(lvl.level);
        let rel = (lvl.energy_above_minimum - e).abs() / e;
        assert!(rel < 2e-3, "v={}: rel {rel:.2e}", lvl.level);
    }
}

#[test]
fn tables_and_order_are_preserved_across_files() {
    let shallow = MorsePotentialConfig::new(300.0, 2.6, 1.3, 1.5, 12.0, 4001);
    let deep = MorsePotentialConfig::new(800.0, 2.6, 1.3, 1.5, 12.0, 4001);
    let (a, b) = (morse_table(&shallow), morse_table(&deep));
    let results = run_files(vec![a.path().to_path_buf(), b.path().to_path_buf()]).expect("task");
    assert_eq!(results.potentials.len(), 2);
    assert!(results.potentials[0].asymptote < results.potentials[1].asymptote);
}

#[test]
fn missing_file_fails_the_task_not_the_submission() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.dat");
    let err = run_files(vec![missing]).unwrap_err();
    assert!(matches!(err, EngineError::PotentialLoad { .. }), "{err}");
}

#[test]
fn malformed_table_names_the_line() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "1.0 5.0\n1.1 4.0\n1.2 three").expect("write");
    file.flush().expect("flush");
    let err = run_files(vec![file.path().to_path_buf()]).unwrap_err();
    match err {
        EngineError::PotentialLoad { reason, .. } => assert!(reason.contains("line 3"), "{reason}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn tabulated_span_too_fine_for_memory_fails_the_task() {
    let curve = MorsePotentialConfig::new(500.0, 2.6, 1.3, 1.5, 12.0, 4001);
    let table = morse_table(&curve);
    let tiny = VibwaAlgorithmConfig {
        integration_step: 1e-14,
        ..algorithm()
    };
    match run_files_with(vec![table.path().to_path_buf()], tiny) {
        Err(EngineError::OutOfDeviceMemory { requested, .. }) => {
            assert!(requested > 8_000_000_000_000_000, "{requested}");
        }
        other => panic!("expected out of memory, got {other:?}"),
    }
}
