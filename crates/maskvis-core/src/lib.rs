//! # maskvis Core Library
//!
//! Perturbation-based per-atom attribution for receptor-ligand scoring
//! functions: remove part of the complex, rescore it, and credit the score
//! change back to the atoms that were removed.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Atom`,
//!   `SpatialKey`), PDBQT record access, bond inference and fragment
//!   enumeration, and the boundary to the external scorer.
//!
//! - **[`engine`]: The Logic Core.** The stateful attribution machinery: the
//!   atom identity index, structural unit selection, the binding-site filter,
//!   perturbation building, the scoring session with its per-atom
//!   accumulators, additivity bookkeeping and annotated output.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (`mask`,
//!   `explain`) that tie the `engine` and `core` together for end users.

pub mod core;
pub mod engine;
pub mod workflows;
