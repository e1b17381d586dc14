use crate::core::io::pdbqt::atom_records;
use crate::core::models::key::SpatialKey;
use crate::core::models::molecule::Molecule;
use std::collections::HashMap;
use tracing::{trace, warn};

#[derive(Debug, Clone, Default)]
pub struct AtomIdentityIndex {
    index_by_key: HashMap<SpatialKey, usize>,
    key_by_index: HashMap<usize, SpatialKey>,
    serial_by_key: HashMap<SpatialKey, u32>,
}

impl AtomIdentityIndex {
    pub fn build(molecule: &Molecule, text: &str) -> Self {
        let mut index = Self::default();

        for atom in molecule.atoms() {
            if let Some(previous) = index.index_by_key.get(&atom.key) {
                warn!(
                    key = %atom.key,
                    first = previous,
                    second = atom.index,
                    "Spatial key collision; keeping the first atom."
                );
                continue;
            }
            index.index_by_key.insert(atom.key.clone(), atom.index);
            index.key_by_index.insert(atom.index, atom.key.clone());
        }

        for (line_num, record) in atom_records(text) {
            match record.serial(line_num) {
                Ok(serial) => {
                    index.serial_by_key.entry(record.key()).or_insert(serial);
                }
                Err(e) => trace!("Untracked serial on line {}: {}", line_num, e),
            }
        }

        index
    }

    pub fn index_of(&self, key: &SpatialKey) -> Option<usize> {
        self.index_by_key.get(key).copied()
    }

    pub fn key_of(&self, index: usize) -> Option<&SpatialKey> {
        self.key_by_index.get(&index)
    }

    pub fn serial_of(&self, key: &SpatialKey) -> Option<u32> {
        self.serial_by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.index_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_by_key.is_empty()
    }
}
