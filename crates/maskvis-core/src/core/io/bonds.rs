//! Distance-based covalent bond inference.
//!
//! PDBQT files carry no connectivity, so bonds are inferred from atom
//! positions and element covalent radii.

use crate::core::models::molecule::Molecule;

/// Slack added to the sum of covalent radii, in Angstroms.
pub const DEFAULT_TOLERANCE: f64 = 0.45;

/// Pairs closer than this are treated as overlapping atoms, not bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

/// Adds a bond for every atom pair within covalent range. H-H pairs are
/// never bonded. Returns the number of bonds added.
///
/// O(n^2), with a per-axis early reject; receptor-sized inputs stay cheap.
pub fn infer_bonds(molecule: &mut Molecule, tolerance: f64) -> usize {
    let max_radius = molecule
        .atoms()
        .iter()
        .map(|a| a.element.covalent_radius())
        .fold(0.0_f64, f64::max);
    let cutoff = 2.0 * max_radius + tolerance;

    let mut pairs = Vec::new();
    let atoms = molecule.atoms();
    for (i, a) in atoms.iter().enumerate() {
        for b in &atoms[i + 1..] {
            if a.element.is_hydrogen() && b.element.is_hydrogen() {
                continue;
            }
            let d = b.position - a.position;
            if d.x.abs() > cutoff || d.y.abs() > cutoff || d.z.abs() > cutoff {
                continue;
            }
            let dist = d.norm();
            let threshold = a.element.covalent_radius() + b.element.covalent_radius() + tolerance;
            if dist > MIN_BOND_DISTANCE && dist <= threshold {
                pairs.push((a.index, b.index));
            }
        }
    }

    pairs
        .into_iter()
        .filter_map(|(a, b)| molecule.add_bond(a, b))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Element};
    use nalgebra::Point3;

    #[test]
    fn bonds_ethanol_like_chain() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::new(0, "C1", Element::C, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(0, "C2", Element::C, Point3::new(1.52, 0.0, 0.0)));
        mol.add_atom(Atom::new(0, "O", Element::O, Point3::new(2.0, 1.35, 0.0)));
        mol.add_atom(Atom::new(0, "HO", Element::H, Point3::new(2.9, 1.4, 0.0)));

        let added = infer_bonds(&mut mol, DEFAULT_TOLERANCE);

        assert_eq!(added, 3);
        assert_eq!(mol.neighbors(1), &[2]);
        assert!(mol.neighbors(2).contains(&3));
        assert_eq!(mol.neighbors(4), &[3]);
    }

    #[test]
    fn distant_atoms_are_not_bonded() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::new(0, "C1", Element::C, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(0, "C2", Element::C, Point3::new(4.0, 0.0, 0.0)));
        assert_eq!(infer_bonds(&mut mol, DEFAULT_TOLERANCE), 0);
    }

    #[test]
    fn hydrogens_are_never_bonded_to_each_other() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::new(0, "H1", Element::H, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(0, "H2", Element::H, Point3::new(0.74, 0.0, 0.0)));
        assert_eq!(infer_bonds(&mut mol, DEFAULT_TOLERANCE), 0);
    }
}
