use super::identity::AtomIdentityIndex;
use crate::core::graph::{BondGraph, FragmentEnumerator};
use crate::core::io::pdbqt::atom_records;
use crate::core::models::key::{ResidueTag, SpatialKey};
use crate::core::models::molecule::Molecule;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Residue,
    AtomWithSatellites,
    Fragment,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitKind::Residue => "residue",
            UnitKind::AtomWithSatellites => "atom",
            UnitKind::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralUnit {
    kind: UnitKind,
    label: String,
    core: BTreeSet<SpatialKey>,
    satellites: BTreeSet<SpatialKey>,
}

impl StructuralUnit {
    pub fn new(
        kind: UnitKind,
        label: impl Into<String>,
        core: BTreeSet<SpatialKey>,
        satellites: BTreeSet<SpatialKey>,
    ) -> Option<Self> {
        if core.is_empty() {
            return None;
        }
        let satellites = satellites.difference(&core).cloned().collect();
        Some(Self {
            kind,
            label: label.into(),
            core,
            satellites,
        })
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn core(&self) -> &BTreeSet<SpatialKey> {
        &self.core
    }

    pub fn satellites(&self) -> &BTreeSet<SpatialKey> {
        &self.satellites
    }

    pub fn removal_set(&self) -> BTreeSet<SpatialKey> {
        self.core.union(&self.satellites).cloned().collect()
    }

    pub fn share(&self, delta: f64) -> f64 {
        match self.kind {
            UnitKind::Residue | UnitKind::AtomWithSatellites => delta,
            UnitKind::Fragment => delta / self.core.len() as f64,
        }
    }
}

pub fn residue_units(text: &str) -> Vec<StructuralUnit> {
    let mut residues: BTreeMap<ResidueTag, BTreeSet<SpatialKey>> = BTreeMap::new();
    for (_, record) in atom_records(text) {
        residues
            .entry(record.residue_tag())
            .or_default()
            .insert(record.key());
    }
    residues
        .into_iter()
        .filter_map(|(tag, atoms)| {
            StructuralUnit::new(UnitKind::Residue, tag.to_string(), atoms, BTreeSet::new())
        })
        .collect()
}

pub fn atom_units(molecule: &Molecule, identity: &AtomIdentityIndex) -> Vec<StructuralUnit> {
    molecule
        .heavy_atoms()
        .filter_map(|atom| {
            let Some(key) = identity.key_of(atom.index) else {
                trace!(index = atom.index, "Heavy atom is not tracked; skipping.");
                return None;
            };
            StructuralUnit::new(
                UnitKind::AtomWithSatellites,
                format!("{} #{}", atom.name, atom.index),
                BTreeSet::from([key.clone()]),
                satellites_of([atom.index], molecule, identity),
            )
        })
        .collect()
}

pub fn fragment_units(
    molecule: &Molecule,
    identity: &AtomIdentityIndex,
    enumerator: &dyn FragmentEnumerator,
    max_size: usize,
) -> Vec<StructuralUnit> {
    let graph = BondGraph::heavy_skeleton(molecule);
    let paths = enumerator.bond_paths(&graph, max_size);

    let mut units = Vec::new();
    for (length, fragments) in &paths {
        debug!(length, count = fragments.len(), "Fragments enumerated.");
        for bonds in fragments {
            let atoms: BTreeSet<usize> = bonds
                .iter()
                .filter_map(|&b| graph.bond(b))
                .flat_map(|(a, b)| [a, b])
                .collect();
            let core = atoms
                .iter()
                .filter_map(|&index| identity.key_of(index).cloned())
                .collect();
            let satellites = satellites_of(atoms.iter().copied(), molecule, identity);
            let label = format!("bonds {:?}", bonds);
            units.extend(StructuralUnit::new(UnitKind::Fragment, label, core, satellites));
        }
    }
    units
}

fn satellites_of(
    atoms: impl IntoIterator<Item = usize>,
    molecule: &Molecule,
    identity: &AtomIdentityIndex,
) -> BTreeSet<SpatialKey> {
    atoms
        .into_iter()
        .flat_map(|index| molecule.hydrogen_neighbors(index))
        .filter_map(|h| identity.key_of(h).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::subgraphs::ConnectedSubgraphs;
    use crate::core::io::pdbqt::read_molecule;
    use crate::core::io::pdbqt::test_lines::atom_line;

    fn key(x: &str) -> SpatialKey {
        SpatialKey::from_fields(x, "0.000", "0.000")
    }

    // C1 - C2(-H) - C3 along x.
    fn propane_fragment() -> (Molecule, AtomIdentityIndex, String) {
        let text = [
            atom_line(1, "C1", 1, 0.0, 0.0, 0.0, "C"),
            atom_line(2, "C2", 1, 1.5, 0.0, 0.0, "C"),
            atom_line(3, "C3", 1, 3.0, 0.0, 0.0, "C"),
            atom_line(4, "H2", 1, 1.5, 1.0, 0.0, "H"),
        ]
        .join("\n");
        let molecule = read_molecule(&text).unwrap();
        let identity = AtomIdentityIndex::build(&molecule, &text);
        (molecule, identity, text)
    }

    #[test]
    fn unit_requires_a_core() {
        assert!(
            StructuralUnit::new(UnitKind::Residue, "empty", BTreeSet::new(), BTreeSet::new())
                .is_none()
        );
    }

    #[test]
    fn residues_group_atoms_by_tag() {
        let text = [
            atom_line(1, "N", 5, 0.0, 0.0, 0.0, "N"),
            atom_line(2, "CA", 5, 1.5, 0.0, 0.0, "C"),
            atom_line(3, "N", 6, 3.0, 0.0, 0.0, "N"),
        ]
        .join("\n");
        let units = residue_units(&text);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].label(), "A   5");
        assert_eq!(units[0].core().len(), 2);
        assert_eq!(units[1].core(), &BTreeSet::from([key("3.000")]));
        assert!(units.iter().all(|u| u.kind() == UnitKind::Residue));
    }

    #[test]
    fn atom_units_carry_bonded_hydrogens_as_satellites() {
        let (molecule, identity, _) = propane_fragment();
        let units = atom_units(&molecule, &identity);

        assert_eq!(units.len(), 3, "hydrogens are never standalone units");
        let middle = &units[1];
        assert_eq!(middle.core(), &BTreeSet::from([key("1.500")]));
        assert_eq!(
            middle.satellites(),
            &BTreeSet::from([SpatialKey::from_fields("1.500", "1.000", "0.000")])
        );
        assert_eq!(middle.removal_set().len(), 2);
        assert!(units[0].satellites().is_empty());
    }

    #[test]
    fn fragments_overlap_and_reattach_hydrogens() {
        let (molecule, identity, _) = propane_fragment();
        let units = fragment_units(&molecule, &identity, &ConnectedSubgraphs, 6);

        // Two single bonds and the two-bond path.
        assert_eq!(units.len(), 3);
        let with_middle = units
            .iter()
            .filter(|u| u.core().contains(&key("1.500")))
            .count();
        assert_eq!(with_middle, 3);
        assert!(units.iter().all(|u| u.satellites().len() == 1));
        assert_eq!(units.iter().map(|u| u.core().len()).max(), Some(3));
    }

    #[test]
    fn fragment_size_is_bounded() {
        let (molecule, identity, _) = propane_fragment();
        let units = fragment_units(&molecule, &identity, &ConnectedSubgraphs, 1);
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.core().len() == 2));
    }

    #[test]
    fn share_differs_between_whole_and_fragment_units() {
        let core = BTreeSet::from([key("0.000"), key("1.500")]);
        let atom_like =
            StructuralUnit::new(UnitKind::Residue, "r", core.clone(), BTreeSet::new()).unwrap();
        let fragment = StructuralUnit::new(UnitKind::Fragment, "f", core, BTreeSet::new()).unwrap();

        assert_eq!(atom_like.share(3.0), 3.0);
        assert_eq!(fragment.share(3.0), 1.5);
    }

    #[test]
    fn selection_is_idempotent() {
        let (molecule, identity, text) = propane_fragment();
        assert_eq!(residue_units(&text), residue_units(&text));
        assert_eq!(
            atom_units(&molecule, &identity),
            atom_units(&molecule, &identity)
        );
        assert_eq!(
            fragment_units(&molecule, &identity, &ConnectedSubgraphs, 6),
            fragment_units(&molecule, &identity, &ConnectedSubgraphs, 6)
        );
    }
}
