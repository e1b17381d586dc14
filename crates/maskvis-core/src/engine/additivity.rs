use super::accumulator::Attribution;
use super::error::AttributionError;
use crate::core::models::key::SpatialKey;
use crate::core::models::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::info;

pub fn combine(
    single: Option<&Attribution>,
    fragment: Option<&Attribution>,
) -> Result<Option<Attribution>, AttributionError> {
    match (single, fragment) {
        (Some(s), Some(f)) => s.average(f).map(Some),
        (Some(only), None) | (None, Some(only)) => Ok(Some(only.clone())),
        (None, None) => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditivityRecord {
    pub source: String,
    pub baseline: f64,
    pub single_total: f64,
    pub fragment_total: f64,
}

impl AdditivityRecord {
    pub fn compute(
        source: &Path,
        baseline: f64,
        single: Option<&Attribution>,
        fragment: Option<&Attribution>,
        ligand: &Molecule,
    ) -> Result<Self, AttributionError> {
        if let (Some(s), Some(f)) = (single, fragment) {
            s.ensure_same_atoms(f)?;
        }
        let heavy: Vec<&SpatialKey> = ligand.heavy_atoms().map(|a| &a.key).collect();
        let total = |attribution: Option<&Attribution>| {
            attribution.map_or(0.0, |a| a.total_over(heavy.iter().copied()))
        };
        let source = source
            .canonicalize()
            .unwrap_or_else(|_| source.to_path_buf());

        Ok(Self {
            source: source.display().to_string(),
            baseline,
            single_total: total(single),
            fragment_total: total(fragment),
        })
    }

    /// Appends this record as one space-separated line. A source path
    /// containing whitespace or quotes is written double-quoted, so split
    /// lines with [`read_log`](Self::read_log) rather than on whitespace.
    pub fn append_to(&self, log: &Path) -> Result<(), AttributionError> {
        let file = OpenOptions::new().create(true).append(true).open(log)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;
        info!(
            "Additivity: baseline {:.5}, single-atom total {:.5}, fragment total {:.5} ({:?})",
            self.baseline, self.single_total, self.fragment_total, log
        );
        Ok(())
    }

    /// Reads every record of an additivity log, unquoting source paths.
    pub fn read_log(log: &Path) -> Result<Vec<Self>, AttributionError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_path(log)?;
        reader
            .deserialize()
            .map(|row| row.map_err(AttributionError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdbqt::read_molecule;
    use crate::core::io::pdbqt::test_lines::atom_line;

    fn ligand() -> Molecule {
        read_molecule(
            &[
                atom_line(1, "C1", 1, 0.0, 0.0, 0.0, "C"),
                atom_line(2, "O1", 1, 1.4, 0.0, 0.0, "OA"),
                atom_line(3, "H1", 1, 1.4, 1.0, 0.0, "HD"),
            ]
            .join("\n"),
        )
        .unwrap()
    }

    fn key(x: &str, y: &str) -> SpatialKey {
        SpatialKey::from_fields(x, y, "0.000")
    }

    fn attribution(c: f64, o: f64, h: f64) -> Attribution {
        [
            (key("0.000", "0.000"), c),
            (key("1.400", "0.000"), o),
            (key("1.400", "1.000"), h),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn combine_averages_only_when_both_exist() {
        let single = attribution(2.0, 0.0, 0.0);
        let fragment = attribution(1.0, 1.0, 0.0);

        let both = combine(Some(&single), Some(&fragment)).unwrap().unwrap();
        assert_eq!(both.get(&key("0.000", "0.000")), Some(1.5));
        assert_eq!(both.get(&key("1.400", "0.000")), Some(0.5));

        assert_eq!(combine(Some(&single), None).unwrap(), Some(single.clone()));
        assert_eq!(combine(None, None).unwrap(), None);
    }

    #[test]
    fn combine_rejects_mismatched_vectors() {
        let single = attribution(2.0, 0.0, 0.0);
        let fragment: Attribution = [(key("0.000", "0.000"), 1.0)].into_iter().collect();
        assert!(matches!(
            combine(Some(&single), Some(&fragment)),
            Err(AttributionError::MismatchedAttributions { .. })
        ));
    }

    #[test]
    fn totals_skip_hydrogens() {
        let single = attribution(2.0, 0.5, 9.0);
        let record =
            AdditivityRecord::compute(Path::new("lig.pdbqt"), 3.0, Some(&single), None, &ligand())
                .unwrap();

        assert_eq!(record.single_total, 2.5);
        assert_eq!(record.fragment_total, 0.0);
        assert_eq!(record.baseline, 3.0);
        assert_eq!(record.source, "lig.pdbqt");
    }

    #[test]
    fn log_is_append_only_and_space_separated() {
        let dir = tempfile::tempdir().unwrap();
        let ligand_path = dir.path().join("lig.pdbqt");
        std::fs::write(&ligand_path, "").unwrap();
        let log = dir.path().join("additivity.log");

        let single = attribution(2.0, 0.5, 0.0);
        let fragment = attribution(1.0, 1.0, 0.0);
        let first = AdditivityRecord::compute(
            &ligand_path,
            3.0,
            Some(&single),
            Some(&fragment),
            &ligand(),
        )
        .unwrap();
        first.append_to(&log).unwrap();
        first.append_to(&log).unwrap();

        let raw = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[0].split(' ').collect();
        assert_eq!(fields.len(), 4);
        assert!(fields[0].ends_with("lig.pdbqt"));
        assert_eq!(&fields[1..], &["3.0", "2.5", "2.0"]);

        let records = AdditivityRecord::read_log(&log).unwrap();
        assert_eq!(records, vec![first.clone(), first]);
    }

    #[test]
    fn paths_with_spaces_are_quoted_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let ligand_dir = dir.path().join("my ligands");
        std::fs::create_dir(&ligand_dir).unwrap();
        let ligand_path = ligand_dir.join("lig.pdbqt");
        std::fs::write(&ligand_path, "").unwrap();
        let log = dir.path().join("additivity.log");

        let record =
            AdditivityRecord::compute(&ligand_path, 3.0, None, None, &ligand()).unwrap();
        record.append_to(&log).unwrap();

        let raw = std::fs::read_to_string(&log).unwrap();
        assert!(raw.starts_with('"'));
        assert!(raw.trim_end().ends_with("\" 3.0 0.0 0.0"));

        let records = AdditivityRecord::read_log(&log).unwrap();
        assert_eq!(records, vec![record]);
        assert!(records[0].source.ends_with("my ligands/lig.pdbqt"));
    }
}
