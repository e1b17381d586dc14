//! Input/output for scorer-compatible structure text.
//!
//! The scorer consumes PDBQT, so PDBQT atom records are the serialized form
//! every perturbation and annotation works on. [`traits`] defines the
//! structure-source boundary; [`pdbqt`] provides record access and a source
//! for inputs that are already PDBQT.

pub mod bonds;
pub mod pdbqt;
pub mod traits;
