//! # Engine Module
//!
//! The ablation engine: selects removable units, scores the complex without
//! each of them, and turns the score changes into per-atom attributions.
//!
//! ## Architecture
//!
//! - **Atom Identity** ([`identity`]) - Joins the library and serialized numberings through spatial keys
//! - **Unit Selection** ([`units`]) - Residues, single heavy atoms with their hydrogens, bounded fragments
//! - **Relevance Filtering** ([`filter`]) - Skips receptor residues far from the ligand
//! - **Perturbation** ([`perturb`]) - Structure text with a unit's atom lines dropped
//! - **Scoring Session** ([`session`]) - Owns the scorer and the baseline, runs the removal passes
//! - **Accumulation** ([`accumulator`]) - Per-atom sum and coverage count, averaged on finalize
//! - **Additivity** ([`additivity`]) - Combines single-atom and fragment results, appends the log
//! - **Annotation** ([`annotate`]) - Writes scores into the structure's score column
//! - **Configuration** ([`config`]), **Progress** ([`progress`]) and **Errors** ([`error`])
//!
//! Everything runs on one thread, one unit at a time. Results do not depend
//! on the order units are visited in.

pub mod accumulator;
pub mod additivity;
pub mod annotate;
pub mod config;
pub mod error;
pub mod filter;
pub mod identity;
pub mod perturb;
pub mod progress;
pub mod session;
pub mod units;
