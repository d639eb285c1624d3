// SPDX-License-Identifier: AGPL-3.0-only

//! Diatomic physics: potentials and the VIBWA level solver.
//!
//!   - `constants` — ħ²/2μ in spectroscopic units
//!   - `morse` — Morse curves and their closed-form levels
//!   - `potential_file` — tabulated two-column curves
//!   - `potential` — source → sampled curves, slab packing
//!   - `vibwa` — Numerov integration, node-count bisection, tail check

pub mod constants;
pub mod morse;
pub mod potential;
pub mod potential_file;
pub mod vibwa;

pub use constants::{kinetic_factor, reduced_mass, HBAR2_OVER_2DA_A2};
pub use morse::{MorseLevels, MorsePotentialConfig};
pub use potential::{evaluate_curves, pack_curves, DiscretizedCurve, PotentialSource};
pub use potential_file::PotentialTable;
pub use vibwa::{
    count_nodes, grid_bytes, grid_len, solve_level, tail_amplitude, IntegrationGrid,
    LevelSolution, SolverParams, VibwaAlgorithmConfig,
};
