use super::key::{ResidueTag, SpatialKey};
use nalgebra::Point3;
use phf::phf_map;
use std::fmt;
use std::str::FromStr;

/// Chemical element of an atom, restricted to what docking inputs contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Element {
    H,
    C,
    N,
    O,
    F,
    P,
    S,
    Cl,
    Br,
    I,
    Mg,
    Ca,
    Mn,
    Fe,
    Zn,
    #[default]
    Unknown,
}

/// AutoDock atom types as written in PDBQT column 78-79, mapped to elements.
static AUTODOCK_TYPES: phf::Map<&'static str, Element> = phf_map! {
    "H" => Element::H,
    "HD" => Element::H,
    "HS" => Element::H,
    "C" => Element::C,
    "A" => Element::C,
    "N" => Element::N,
    "NA" => Element::N,
    "NS" => Element::N,
    "OA" => Element::O,
    "OS" => Element::O,
    "O" => Element::O,
    "F" => Element::F,
    "P" => Element::P,
    "S" => Element::S,
    "SA" => Element::S,
    "Cl" => Element::Cl,
    "CL" => Element::Cl,
    "Br" => Element::Br,
    "BR" => Element::Br,
    "I" => Element::I,
    "Mg" => Element::Mg,
    "MG" => Element::Mg,
    "Ca" => Element::Ca,
    "CA" => Element::Ca,
    "Mn" => Element::Mn,
    "MN" => Element::Mn,
    "Fe" => Element::Fe,
    "FE" => Element::Fe,
    "Zn" => Element::Zn,
    "ZN" => Element::Zn,
};

impl Element {
    /// Resolves an AutoDock atom type (e.g. `"OA"`, `"HD"`, `"A"`).
    pub fn from_autodock_type(ad_type: &str) -> Self {
        AUTODOCK_TYPES
            .get(ad_type.trim())
            .copied()
            .unwrap_or(Element::Unknown)
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    /// Covalent radius in Angstroms, used for bond inference.
    pub fn covalent_radius(self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::F => 0.57,
            Element::P => 1.07,
            Element::S => 1.05,
            Element::Cl => 1.02,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Mg => 1.41,
            Element::Ca => 1.76,
            Element::Mn => 1.39,
            Element::Fe => 1.32,
            Element::Zn => 1.22,
            Element::Unknown => 0.77,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Br => "Br",
            Element::I => "I",
            Element::Mg => "Mg",
            Element::Ca => "Ca",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Zn => "Zn",
            Element::Unknown => "X",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = ();

    /// Parses a plain element symbol, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h" => Ok(Element::H),
            "c" => Ok(Element::C),
            "n" => Ok(Element::N),
            "o" => Ok(Element::O),
            "f" => Ok(Element::F),
            "p" => Ok(Element::P),
            "s" => Ok(Element::S),
            "cl" => Ok(Element::Cl),
            "br" => Ok(Element::Br),
            "i" => Ok(Element::I),
            "mg" => Ok(Element::Mg),
            "ca" => Ok(Element::Ca),
            "mn" => Ok(Element::Mn),
            "fe" => Ok(Element::Fe),
            "zn" => Ok(Element::Zn),
            _ => Err(()),
        }
    }
}

/// An atom as seen by the structure library.
///
/// `index` is the atom's position in the library-internal numbering
/// (1-based). `key` is the canonical identity shared with the serialized
/// text; the serialized line serial is deliberately not stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub index: usize,
    pub name: String,
    pub element: Element,
    pub residue: ResidueTag,
    pub position: Point3<f64>,
    pub key: SpatialKey,
}

impl Atom {
    /// Creates an atom whose key is derived from its position.
    pub fn new(index: usize, name: &str, element: Element, position: Point3<f64>) -> Self {
        Self {
            index,
            name: name.to_string(),
            element,
            residue: ResidueTag::new(""),
            key: SpatialKey::from_position(&position),
            position,
        }
    }

    pub fn is_heavy(&self) -> bool {
        !self.element.is_hydrogen()
    }
}
