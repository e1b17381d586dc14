use crate::core::io::pdbqt::{ENDROOT_MARKER, ROOT_MARKER, TORSDOF_ZERO, atom_records};
use crate::core::models::key::SpatialKey;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perturbation {
    pub text: String,
    pub retained: usize,
    pub removed: usize,
}

impl Perturbation {
    pub fn is_empty(&self) -> bool {
        self.retained == 0
    }
}

pub fn remove_atoms(source: &str, removal: &BTreeSet<SpatialKey>) -> Perturbation {
    let mut text = String::with_capacity(source.len() + 32);
    text.push_str(ROOT_MARKER);
    text.push('\n');

    let mut retained = 0;
    let mut removed = 0;
    for (_, record) in atom_records(source) {
        if removal.contains(&record.key()) {
            removed += 1;
            continue;
        }
        text.push_str(record.line());
        text.push('\n');
        retained += 1;
    }

    text.push_str(ENDROOT_MARKER);
    text.push('\n');
    text.push_str(TORSDOF_ZERO);
    text.push('\n');

    Perturbation {
        text,
        retained,
        removed,
    }
}
