use super::bonds::{self, DEFAULT_TOLERANCE};
use super::traits::{HydrogenMode, MoleculeRole, PreparedStructure, StructureSource};
use crate::core::models::atom::{Atom, Element};
use crate::core::models::key::{ResidueTag, SpatialKey};
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const ROOT_MARKER: &str = "ROOT";
pub const ENDROOT_MARKER: &str = "ENDROOT";
pub const TORSDOF_ZERO: &str = "TORSDOF 0";

const SERIAL_COLUMNS: Range<usize> = 6..11;
const NAME_COLUMNS: Range<usize> = 12..16;
const RESIDUE_TAG_COLUMNS: Range<usize> = 21..27;
const X_COLUMNS: Range<usize> = 30..38;
const Y_COLUMNS: Range<usize> = 38..46;
const Z_COLUMNS: Range<usize> = 46..54;
const TYPE_COLUMNS: Range<usize> = 77..79;

/// First column of the score-display field.
pub const SCORE_FIELD_START: usize = 61;
/// First column after the narrow score-display field.
pub const SCORE_FIELD_END: usize = 66;

#[derive(Debug, Error)]
pub enum PdbqtError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbqtParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbqtParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn column<'a>(line: &'a str, range: Range<usize>) -> &'a str {
    let end = range.end.min(line.len());
    line.get(range.start.min(end)..end).unwrap_or("")
}

fn columns_label(range: &Range<usize>) -> String {
    format!("{}-{}", range.start + 1, range.end)
}

/// Whether a line is an atom record (`ATOM` or `HETATM`).
pub fn is_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

/// Borrowed view of one atom record line.
#[derive(Debug, Clone, Copy)]
pub struct AtomRecord<'a> {
    line: &'a str,
}

impl<'a> AtomRecord<'a> {
    /// Wraps `line` if it is an atom record long enough to carry coordinates.
    ///
    /// Returns `None` for non-atom lines and an error for truncated atom lines.
    pub fn parse(line: &'a str, line_num: usize) -> Result<Option<Self>, PdbqtError> {
        if !is_atom_record(line) {
            return Ok(None);
        }
        if line.len() < Z_COLUMNS.end {
            return Err(PdbqtError::Parse {
                line: line_num,
                kind: PdbqtParseErrorKind::LineTooShort,
            });
        }
        Ok(Some(Self { line }))
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    /// Canonical identity of the atom on this line.
    pub fn key(&self) -> SpatialKey {
        SpatialKey::from_fields(
            column(self.line, X_COLUMNS),
            column(self.line, Y_COLUMNS),
            column(self.line, Z_COLUMNS),
        )
    }

    pub fn residue_tag(&self) -> ResidueTag {
        ResidueTag::new(column(self.line, RESIDUE_TAG_COLUMNS))
    }

    pub fn name(&self) -> &'a str {
        column(self.line, NAME_COLUMNS).trim()
    }

    pub fn autodock_type(&self) -> &'a str {
        column(self.line, TYPE_COLUMNS).trim()
    }

    /// Serial number in the serialized numbering.
    pub fn serial(&self, line_num: usize) -> Result<u32, PdbqtError> {
        let raw = column(self.line, SERIAL_COLUMNS).trim();
        raw.parse().map_err(|_| PdbqtError::Parse {
            line: line_num,
            kind: PdbqtParseErrorKind::InvalidInt {
                columns: columns_label(&SERIAL_COLUMNS),
                value: raw.into(),
            },
        })
    }

    pub fn position(&self, line_num: usize) -> Result<Point3<f64>, PdbqtError> {
        let coord = |range: Range<usize>| -> Result<f64, PdbqtError> {
            let raw = column(self.line, range.clone()).trim();
            raw.parse().map_err(|_| PdbqtError::Parse {
                line: line_num,
                kind: PdbqtParseErrorKind::InvalidFloat {
                    columns: columns_label(&range),
                    value: raw.into(),
                },
            })
        };
        Ok(Point3::new(
            coord(X_COLUMNS)?,
            coord(Y_COLUMNS)?,
            coord(Z_COLUMNS)?,
        ))
    }

    /// Element from the AutoDock type, falling back to the atom name.
    pub fn element(&self) -> Element {
        match Element::from_autodock_type(self.autodock_type()) {
            Element::Unknown => self
                .name()
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .get(..1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(Element::Unknown),
            element => element,
        }
    }
}

/// Iterates the atom records of `text` with their 1-based line numbers.
pub fn atom_records(text: &str) -> impl Iterator<Item = (usize, AtomRecord<'_>)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| is_atom_record(line) && line.len() >= Z_COLUMNS.end)
        .map(|(i, line)| (i + 1, AtomRecord { line }))
}

/// Parses every atom record of `text` into a molecule in line order and
/// infers its bonds.
///
/// # Errors
///
/// Returns an error for truncated atom lines, unparseable coordinates, or
/// text without any atom record.
pub fn read_molecule(text: &str) -> Result<Molecule, PdbqtError> {
    let mut molecule = Molecule::new();
    for (i, line) in text.lines().enumerate() {
        let line_num = i + 1;
        let Some(record) = AtomRecord::parse(line, line_num)? else {
            continue;
        };
        let position = record.position(line_num)?;
        let mut atom = Atom::new(0, record.name(), record.element(), position);
        atom.residue = record.residue_tag();
        atom.key = record.key();
        molecule.add_atom(atom);
    }
    if molecule.is_empty() {
        return Err(PdbqtError::MissingRecord("ATOM/HETATM records".into()));
    }
    let bonds = bonds::infer_bonds(&mut molecule, DEFAULT_TOLERANCE);
    debug!(atoms = molecule.len(), bonds, "Parsed PDBQT molecule.");
    Ok(molecule)
}

/// Adds the rigid-body markers the scorer expects when they are missing.
pub fn ensure_rigid_markers(text: &str) -> String {
    let has = |marker: &str| {
        text.lines()
            .any(|line| line.split_whitespace().next() == Some(marker))
    };
    let mut out = String::with_capacity(text.len() + 32);
    if !has(ROOT_MARKER) {
        out.push_str(ROOT_MARKER);
        out.push('\n');
    }
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
    if !has(ENDROOT_MARKER) {
        out.push_str(ENDROOT_MARKER);
        out.push('\n');
    }
    if !has("TORSDOF") {
        out.push_str(TORSDOF_ZERO);
        out.push('\n');
    }
    out
}

/// Structure source for inputs that are already PDBQT.
///
/// Hydrogens present in the file are kept as they are; no new hydrogens are
/// synthesized, whatever [`HydrogenMode`] is requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdbqtSource;

impl StructureSource for PdbqtSource {
    type Error = PdbqtError;

    fn prepare(
        &self,
        path: &Path,
        role: MoleculeRole,
        hydrogens: HydrogenMode,
    ) -> Result<PreparedStructure, Self::Error> {
        info!("Loading {} from {:?}", role, path);
        let raw = fs::read_to_string(path)?;
        let text = ensure_rigid_markers(&raw);
        let molecule = read_molecule(&text)?;
        debug!(
            ?hydrogens,
            hydrogens_present = molecule.atoms().iter().filter(|a| !a.is_heavy()).count(),
            "Keeping hydrogens from input."
        );
        Ok(PreparedStructure {
            role,
            source_path: path.to_path_buf(),
            molecule,
            text,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_lines {
    /// Formats a PDBQT atom line with standard column layout.
    pub fn atom_line(
        serial: u32,
        name: &str,
        res_seq: i32,
        x: f64,
        y: f64,
        z: f64,
        ad_type: &str,
    ) -> String {
        format!(
            "ATOM  {:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}    {:>6.3} {:<2}",
            serial, name, "LIG", 'A', res_seq, x, y, z, 1.0, 0.0, 0.0, ad_type
        )
    }
}
