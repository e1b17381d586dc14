use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which half of the complex a structure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MoleculeRole {
    Receptor,
    Ligand,
}

impl fmt::Display for MoleculeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoleculeRole::Receptor => "receptor",
            MoleculeRole::Ligand => "ligand",
        })
    }
}

/// How hydrogens should be completed when a structure is prepared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HydrogenMode {
    /// Add every missing hydrogen.
    All,
    /// Add only polar hydrogens, protonated for the given pH.
    PolarAtPh(f64),
}

impl HydrogenMode {
    /// The mode the attribution run uses for each role.
    pub fn for_role(role: MoleculeRole) -> Self {
        match role {
            MoleculeRole::Receptor => HydrogenMode::All,
            MoleculeRole::Ligand => HydrogenMode::PolarAtPh(7.4),
        }
    }
}

/// A structure ready for perturbation.
///
/// `molecule` is the library-side view (internal numbering, elements, bonds)
/// and `text` is the scorer-compatible serialization whose atom lines define
/// the serialized numbering. Both describe the same atoms.
#[derive(Debug, Clone)]
pub struct PreparedStructure {
    pub role: MoleculeRole,
    pub source_path: PathBuf,
    pub molecule: Molecule,
    pub text: String,
}

impl PreparedStructure {
    /// File stem of the source path, used to name annotated outputs.
    pub fn stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.role.to_string())
    }
}

/// Loads a structure file, completes hydrogens and serializes it for the
/// scorer.
pub trait StructureSource {
    /// The error type for loading and conversion.
    type Error: Error + Send + Sync + 'static;

    /// Reads `path` and prepares it for the given role.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. This is fatal
    /// for an attribution run and happens before any scoring.
    fn prepare(
        &self,
        path: &Path,
        role: MoleculeRole,
        hydrogens: HydrogenMode,
    ) -> Result<PreparedStructure, Self::Error>;
}
