//! # Core Models Module
//!
//! Data structures for the molecules being perturbed.
//!
//! - [`atom`] - Atoms and elements, including AutoDock type resolution
//! - [`molecule`] - A molecule in the structure library's numbering, with bonds
//! - [`key`] - Canonical spatial keys and residue tags shared by both numbering schemes

pub mod atom;
pub mod key;
pub mod molecule;
