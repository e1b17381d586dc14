//! # Core Module
//!
//! Building blocks the attribution engine works on.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, molecules, spatial keys and residue tags
//! - **File I/O** ([`io`]) - PDBQT atom records, bond inference and the structure-source boundary
//! - **Connectivity** ([`graph`]) - Heavy-atom bond graphs and bounded fragment enumeration
//! - **Scoring** ([`scoring`]) - The scorer and explainer interfaces, plus an external-program adapter
//!
//! Nothing in this layer holds state across calls; the predictive model
//! itself lives behind [`scoring::Scorer`].

pub mod graph;
pub mod io;
pub mod models;
pub mod scoring;
