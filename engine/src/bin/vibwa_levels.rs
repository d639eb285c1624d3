// SPDX-License-Identifier: AGPL-3.0-only

//! Compute vibrational levels for a task file, or for the built-in Sr₂ demo.
//!
//! ```text
//! vibwa_levels [--task=task.json] [--precision=float32|float64]
//!              [--device=auto|<index>|<name>] [--output=levels.json]
//!              [--list-devices]
//! ```
//!
//! A task file is the JSON form of a task configuration:
//!
//! ```json
//! {
//!   "precision": "float64",
//!   "hardware": { "potential_buffer_size": 4096, "group_size": 64,
//!                 "dispatch_count": 64, "allocation_block_size": 65536 },
//!   "potential": { "morse": [ { "dissociation_energy": 500.0,
//!       "equilibrium_bond_distance": 2.6, "well_width": 1.3,
//!       "min_r": 1.5, "max_r": 12.0, "point_count": 4001 } ] },
//!   "algorithm": { "mass_atom_0": 87.62, "mass_atom_1": 87.62,
//!       "integration_step": 0.005, "min_distance_to_asymptote": 0.1,
//!       "min_level": 0, "max_level": 9 }
//! }
//! ```
//!
//! Device selection follows `EPSEON_DEVICE` unless `--device` is given.
//! Results go to stdout as JSON unless `--output` names a file.

use epseon_engine::physics::{MorsePotentialConfig, PotentialSource, VibwaAlgorithmConfig};
use epseon_engine::{
    init_tracing, DeviceCatalog, DeviceInterface, EngineConfig, HardwareConfig, Precision,
    TaskConfiguration, TaskConfigurator,
};
use epseon_forge::inventory::print_inventory;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Default)]
struct CliArgs {
    task: Option<PathBuf>,
    precision: Option<String>,
    device: Option<String>,
    output: Option<PathBuf>,
    list_devices: bool,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--task=") {
            args.task = Some(PathBuf::from(val));
        } else if let Some(val) = arg.strip_prefix("--precision=") {
            args.precision = Some(val.to_string());
        } else if let Some(val) = arg.strip_prefix("--device=") {
            args.device = Some(val.to_string());
        } else if let Some(val) = arg.strip_prefix("--output=") {
            args.output = Some(PathBuf::from(val));
        } else if arg == "--list-devices" {
            args.list_devices = true;
        } else {
            return Err(format!("unknown argument '{arg}'"));
        }
    }
    Ok(args)
}

/// Sr₂-like ground state: Dₑ = 500 cm⁻¹, rₑ = 2.6 Å, a = 1.3 Å⁻¹.
fn demo_task(precision: Precision) -> TaskConfiguration {
    TaskConfiguration {
        precision,
        hardware: HardwareConfig::new(4096, 64, 64, 1 << 16),
        potential: PotentialSource::Morse(vec![MorsePotentialConfig::new(
            500.0, 2.6, 1.3, 1.5, 12.0, 4001,
        )]),
        algorithm: VibwaAlgorithmConfig {
            mass_atom_0: 87.62,
            mass_atom_1: 87.62,
            integration_step: 0.005,
            min_distance_to_asymptote: 0.1,
            min_level: 0,
            max_level: 9,
        },
    }
}

fn load_task(path: &Path) -> Result<TaskConfiguration, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read task file {}: {e}", path.display()))?;
    let task = serde_json::from_str(&text)
        .map_err(|e| format!("cannot parse task file {}: {e}", path.display()))?;
    Ok(task)
}

/// Replay a configuration through the staged builder so every stage is
/// validated the same way as library callers.
fn configure(
    iface: &DeviceInterface,
    task: TaskConfiguration,
) -> Result<TaskConfigurator, Box<dyn Error>> {
    let mut configurator = iface.get_task_configurator(task.precision.token())?;
    configurator.set_hardware_config(task.hardware)?;
    match task.potential {
        PotentialSource::Morse(curves) => configurator.set_morse_potential(curves)?,
        PotentialSource::Files(paths) => configurator.set_potential_files(paths)?,
    };
    configurator.set_vibwa_algorithm(task.algorithm)?;
    Ok(configurator)
}

fn run(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(device) = args.device {
        config.device_selector = device;
    }
    let catalog = DeviceCatalog::enumerate(config.backend)?;
    if args.list_devices {
        print_inventory(&catalog);
        return Ok(());
    }

    let mut task = match &args.task {
        Some(path) => load_task(path)?,
        None => demo_task(Precision::Float64),
    };
    if let Some(token) = &args.precision {
        task.precision = token.parse()?;
    }

    let iface = DeviceInterface::bind_default(&catalog, &config)?;
    drop(catalog);
    if !iface.runs_natively(task.precision) {
        info!(
            device = %iface.descriptor().name,
            precision = %task.precision,
            "device cannot run this precision natively, the host pool will solve it"
        );
    }

    let configurator = configure(&iface, task)?;
    let handle = iface.submit_task(&configurator)?;
    while !handle.is_done() {
        info!("{}", handle.get_status_message());
        if handle.wait(Some(Duration::from_millis(500))).is_ok() {
            break;
        }
    }
    info!("{}", handle.get_status_message());

    let results = handle.wait(None)?;
    let json = results.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
            info!(path = %path.display(), "levels written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    init_tracing();
    let outcome = parse_args()
        .map_err(Box::<dyn Error>::from)
        .and_then(run);
    if let Err(e) = outcome {
        error!("{e}");
        process::exit(1);
    }
}
