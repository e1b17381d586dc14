use super::atom::Atom;
use nalgebra::{Point3, Vector3};

/// A covalent bond between two atoms, by library-internal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize) -> Self {
        Self { atom1, atom2 }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.atom1 == index || self.atom2 == index
    }
}

/// A parsed molecule in the structure library's own numbering.
///
/// Atom indices are 1-based and dense: the atom with index `i` is stored at
/// position `i - 1`. Bonds are kept both as a list and as a cached adjacency
/// table.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom and returns the index it was assigned.
    ///
    /// The atom's own `index` field is overwritten so that it always agrees
    /// with its storage position.
    pub fn add_atom(&mut self, mut atom: Atom) -> usize {
        let index = self.atoms.len() + 1;
        atom.index = index;
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        index
    }

    /// Adds a bond between two existing atoms.
    ///
    /// Returns `None` if either index is out of range or the bond would be a
    /// self-loop. Adding an existing bond again is a successful no-op.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize) -> Option<()> {
        if atom1 == atom2 || self.atom(atom1).is_none() || self.atom(atom2).is_none() {
            return None;
        }
        if self.adjacency[atom1 - 1].contains(&atom2) {
            return Some(());
        }
        self.bonds.push(Bond::new(atom1, atom2));
        self.adjacency[atom1 - 1].push(atom2);
        self.adjacency[atom2 - 1].push(atom1);
        Some(())
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        index.checked_sub(1).and_then(|i| self.atoms.get(i))
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Indices of the atoms directly bonded to `index`.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        index
            .checked_sub(1)
            .and_then(|i| self.adjacency.get(i))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Indices of the hydrogens directly bonded to `index`.
    pub fn hydrogen_neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors(index).iter().copied().filter(|&n| {
            self.atom(n)
                .is_some_and(|atom| atom.element.is_hydrogen())
        })
    }

    pub fn heavy_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().filter(|atom| atom.is_heavy())
    }

    /// Geometric center of all atoms, or `None` for an empty molecule.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum = self
            .atoms
            .iter()
            .fold(Vector3::zeros(), |acc, atom| acc + atom.position.coords);
        Some(Point3::from(sum / self.atoms.len() as f64))
    }
}
