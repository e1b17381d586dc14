//! # Workflows Module
//!
//! End-to-end procedures over one receptor-ligand complex.
//!
//! - **Masking** ([`mask`]) - Ablation attribution: receptor residues inside the
//!   binding site, then ligand single atoms and fragments, written as annotated
//!   structures with an optional additivity log entry.
//! - **Explanation** ([`explain`]) - Gradient or relevance-propagation scores
//!   computed by the scorer itself and written in the same annotated format.
//!
//! Both start from structures prepared by [`prepare_complex`].

pub mod explain;
pub mod mask;

use crate::core::io::traits::{HydrogenMode, MoleculeRole, PreparedStructure, StructureSource};
use crate::engine::error::AttributionError;
use std::path::Path;
use tracing::info;

pub fn prepare_complex<S: StructureSource>(
    source: &S,
    receptor: &Path,
    ligand: &Path,
) -> Result<(PreparedStructure, PreparedStructure), AttributionError> {
    let load = |path: &Path, role: MoleculeRole| {
        source
            .prepare(path, role, HydrogenMode::for_role(role))
            .map_err(|e| AttributionError::Structure {
                role,
                source: Box::new(e),
            })
    };
    let receptor = load(receptor, MoleculeRole::Receptor)?;
    let ligand = load(ligand, MoleculeRole::Ligand)?;
    info!(
        receptor_atoms = receptor.molecule.len(),
        ligand_atoms = ligand.molecule.len(),
        "Complex prepared."
    );
    Ok((receptor, ligand))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::io::pdbqt::test_lines::atom_line;
    use std::path::{Path, PathBuf};

    // Writes a two-residue receptor and a three-carbon ligand with one
    // polar hydrogen into `dir`.
    pub fn write_complex(dir: &Path) -> (PathBuf, PathBuf) {
        let receptor = [
            atom_line(1, "N", 10, 4.0, 4.0, 0.0, "NA"),
            atom_line(2, "CA", 10, 5.4, 4.0, 0.0, "C"),
            atom_line(3, "N", 11, 50.0, 0.0, 0.0, "NA"),
        ]
        .join("\n");
        let ligand = [
            atom_line(1, "C1", 1, 0.0, 0.0, 0.0, "C"),
            atom_line(2, "C2", 1, 1.5, 0.0, 0.0, "C"),
            atom_line(3, "O3", 1, 3.0, 0.0, 0.0, "OA"),
            atom_line(4, "HO", 1, 3.0, 0.95, 0.0, "HD"),
        ]
        .join("\n");
        let receptor_path = dir.join("rec.pdbqt");
        let ligand_path = dir.join("lig.pdbqt");
        std::fs::write(&receptor_path, receptor).unwrap();
        std::fs::write(&ligand_path, ligand).unwrap();
        (receptor_path, ligand_path)
    }
}
