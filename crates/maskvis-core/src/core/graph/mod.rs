//! Heavy-atom connectivity and fragment enumeration.
//!
//! Fragments are enumerated over the heavy-atom skeleton only; hydrogens are
//! reattached to each fragment afterwards by the unit selector.

pub mod subgraphs;

use crate::core::models::molecule::Molecule;
use std::collections::BTreeMap;

/// The heavy-atom skeleton of a molecule.
///
/// Atoms are referenced by library-internal index; bonds are numbered by
/// their position in [`BondGraph::bonds`], and fragment enumerators report
/// fragments as lists of these bond numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondGraph {
    atoms: Vec<usize>,
    bonds: Vec<(usize, usize)>,
    incident: BTreeMap<usize, Vec<usize>>,
}

impl BondGraph {
    /// Builds the skeleton of `molecule` with every hydrogen stripped.
    pub fn heavy_skeleton(molecule: &Molecule) -> Self {
        let atoms: Vec<usize> = molecule.heavy_atoms().map(|a| a.index).collect();
        let is_heavy = |index: usize| molecule.atom(index).is_some_and(|a| a.is_heavy());
        let bonds = molecule
            .bonds()
            .iter()
            .filter(|b| is_heavy(b.atom1) && is_heavy(b.atom2))
            .map(|b| (b.atom1.min(b.atom2), b.atom1.max(b.atom2)))
            .collect();
        Self::from_parts(atoms, bonds)
    }

    /// Builds a graph from explicit atom and bond lists.
    pub fn from_parts(atoms: Vec<usize>, bonds: Vec<(usize, usize)>) -> Self {
        let mut incident: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &(a, b)) in bonds.iter().enumerate() {
            incident.entry(a).or_default().push(i);
            incident.entry(b).or_default().push(i);
        }
        Self {
            atoms,
            bonds,
            incident,
        }
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    pub fn bond(&self, bond_index: usize) -> Option<(usize, usize)> {
        self.bonds.get(bond_index).copied()
    }

    /// Bond numbers touching `atom`.
    pub fn incident_bonds(&self, atom: usize) -> &[usize] {
        self.incident
            .get(&atom)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Enumerates bounded-size connected fragments of a bond graph.
pub trait FragmentEnumerator {
    /// Returns, for every length in `1..=max_len`, the bond-number lists of
    /// the fragments with that many bonds. Lengths with no fragment may be
    /// absent from the map.
    fn bond_paths(&self, graph: &BondGraph, max_len: usize) -> BTreeMap<usize, Vec<Vec<usize>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Element};
    use nalgebra::Point3;

    #[test]
    fn heavy_skeleton_strips_hydrogens_and_their_bonds() {
        let mut mol = Molecule::new();
        let c1 = mol.add_atom(Atom::new(0, "C1", Element::C, Point3::new(0.0, 0.0, 0.0)));
        let c2 = mol.add_atom(Atom::new(0, "C2", Element::C, Point3::new(1.5, 0.0, 0.0)));
        let h = mol.add_atom(Atom::new(0, "H", Element::H, Point3::new(2.5, 0.0, 0.0)));
        mol.add_bond(c2, c1).unwrap();
        mol.add_bond(c2, h).unwrap();

        let graph = BondGraph::heavy_skeleton(&mol);

        assert_eq!(graph.atoms(), &[c1, c2]);
        assert_eq!(graph.bonds(), &[(c1, c2)]);
        assert_eq!(graph.incident_bonds(c1), &[0]);
        assert!(graph.incident_bonds(h).is_empty());
    }

    #[test]
    fn bond_lookup_out_of_range_is_none() {
        let graph = BondGraph::from_parts(vec![1, 2], vec![(1, 2)]);
        assert_eq!(graph.bond(0), Some((1, 2)));
        assert_eq!(graph.bond(1), None);
    }
}
