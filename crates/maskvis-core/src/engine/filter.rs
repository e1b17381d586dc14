use super::config::BindingSiteConfig;
use super::identity::AtomIdentityIndex;
use super::units::StructuralUnit;
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingSiteBox {
    center: Point3<f64>,
    half_width: f64,
}

impl BindingSiteBox {
    pub fn new(center: Point3<f64>, half_width: f64) -> Self {
        Self { center, half_width }
    }

    pub fn around(ligand: &Molecule, half_width: f64) -> Option<Self> {
        ligand.centroid().map(|center| Self::new(center, half_width))
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (point - self.center)
            .iter()
            .all(|d| d.abs() < self.half_width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelevanceFilter {
    AdmitAll,
    BindingSite(BindingSiteBox),
}

impl RelevanceFilter {
    pub fn from_config(config: &BindingSiteConfig, ligand: &Molecule) -> Self {
        if !config.enabled {
            return RelevanceFilter::AdmitAll;
        }
        BindingSiteBox::around(ligand, config.half_width)
            .map_or(RelevanceFilter::AdmitAll, RelevanceFilter::BindingSite)
    }

    pub fn admits(
        &self,
        unit: &StructuralUnit,
        molecule: &Molecule,
        identity: &AtomIdentityIndex,
    ) -> bool {
        match self {
            RelevanceFilter::AdmitAll => true,
            RelevanceFilter::BindingSite(site) => unit
                .core()
                .iter()
                .filter_map(|key| identity.index_of(key))
                .filter_map(|index| molecule.atom(index))
                .any(|atom| site.contains(&atom.position)),
        }
    }
}
