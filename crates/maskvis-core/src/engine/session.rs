use super::accumulator::{Attribution, AttributionAccumulator};
use super::error::AttributionError;
use super::filter::RelevanceFilter;
use super::identity::AtomIdentityIndex;
use super::perturb::{self, Perturbation};
use super::progress::{Progress, ProgressReporter};
use super::units::{self, StructuralUnit};
use crate::core::graph::FragmentEnumerator;
use crate::core::io::pdbqt::atom_records;
use crate::core::io::traits::{MoleculeRole, PreparedStructure};
use crate::core::scoring::{
    Complex, Explainer, Explanation, ExplanationMode, Score, Scorer, ScorerSetup, ScoringTarget,
};
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

/// Score used in place of the scorer when a perturbation removes the
/// whole ligand.
pub const LIGAND_REMOVED_SCORE: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub target: ScoringTarget,
    pub score: f64,
    pub raw: Score,
}

#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub attribution: Attribution,
    pub units: usize,
    pub scored: usize,
}

#[derive(Debug)]
struct PerturbationDump {
    directory: PathBuf,
    written: usize,
}

impl PerturbationDump {
    fn write(
        &mut self,
        role: MoleculeRole,
        serials: &[u32],
        perturbation: &Perturbation,
    ) -> Result<PathBuf, AttributionError> {
        self.written += 1;
        let path = self
            .directory
            .join(format!("mod_{}_{}.pdbqt", role, self.written));
        let serials: Vec<String> = serials.iter().map(|s| s.to_string()).collect();
        let content = format!(
            "REMARK ATOMS REMOVED [{}]\n{}",
            serials.join(", "),
            perturbation.text
        );
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// One attribution run over one receptor-ligand complex.
///
/// The session owns the scorer for its whole lifetime: the scorer is
/// initialized once and the baseline scored once in [`start`](Self::start),
/// then every removal pass reuses both. Identity indices are built on first
/// use and shared by all passes; accumulators belong to the pass that
/// creates them.
pub struct AttributionSession<'a, S> {
    scorer: S,
    receptor: &'a PreparedStructure,
    ligand: &'a PreparedStructure,
    baseline: Baseline,
    receptor_identity: OnceCell<AtomIdentityIndex>,
    ligand_identity: OnceCell<AtomIdentityIndex>,
    reporter: &'a ProgressReporter<'a>,
    dump: Option<PerturbationDump>,
}

impl<'a, S: Scorer> AttributionSession<'a, S> {
    #[instrument(skip_all, name = "session_start", fields(%target))]
    pub fn start(
        mut scorer: S,
        receptor: &'a PreparedStructure,
        ligand: &'a PreparedStructure,
        target: ScoringTarget,
        setup: &ScorerSetup,
        reporter: &'a ProgressReporter<'a>,
    ) -> Result<Self, AttributionError> {
        scorer.initialize(setup)?;
        debug!(device = ?setup.device, "Scorer initialized.");

        let raw = scorer.score(&Complex {
            receptor: &receptor.text,
            ligand: &ligand.text,
        })?;
        let score = raw.value(target)?;
        info!("Baseline {} score: {:.5}", target, score);

        Ok(Self {
            scorer,
            receptor,
            ligand,
            baseline: Baseline { target, score, raw },
            receptor_identity: OnceCell::new(),
            ligand_identity: OnceCell::new(),
            reporter,
            dump: None,
        })
    }

    pub fn dump_perturbations(&mut self, directory: &Path) -> Result<(), AttributionError> {
        fs::create_dir_all(directory)?;
        for structure in [self.receptor, self.ligand] {
            let path = directory.join(format!("unmodified_{}.pdbqt", structure.role));
            fs::write(path, &structure.text)?;
        }
        self.dump = Some(PerturbationDump {
            directory: directory.to_path_buf(),
            written: 0,
        });
        info!("Dumping perturbed structures to {:?}", directory);
        Ok(())
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn structure(&self, role: MoleculeRole) -> &'a PreparedStructure {
        match role {
            MoleculeRole::Receptor => self.receptor,
            MoleculeRole::Ligand => self.ligand,
        }
    }

    pub fn identity(&self, role: MoleculeRole) -> &AtomIdentityIndex {
        let cell = match role {
            MoleculeRole::Receptor => &self.receptor_identity,
            MoleculeRole::Ligand => &self.ligand_identity,
        };
        let structure = self.structure(role);
        cell.get_or_init(|| {
            let index = AtomIdentityIndex::build(&structure.molecule, &structure.text);
            debug!(%role, atoms = index.len(), "Identity index built.");
            index
        })
    }

    pub fn scorer_description(&self) -> Vec<String> {
        self.scorer.describe()
    }

    pub fn into_scorer(self) -> S {
        self.scorer
    }

    pub fn rescore(
        &mut self,
        role: MoleculeRole,
        unit: &StructuralUnit,
    ) -> Result<f64, AttributionError> {
        let (receptor, ligand) = (self.receptor, self.ligand);
        let removal = unit.removal_set();
        let perturbation = perturb::remove_atoms(&self.structure(role).text, &removal);

        if self.dump.is_some() {
            let identity = self.identity(role);
            let serials: Vec<u32> = removal
                .iter()
                .filter_map(|key| identity.serial_of(key))
                .collect();
            if let Some(dump) = self.dump.as_mut() {
                let path = dump.write(role, &serials, &perturbation)?;
                trace!(?path, "Perturbation dumped.");
            }
        }

        if role == MoleculeRole::Ligand && perturbation.is_empty() {
            debug!(unit = unit.label(), "Unit removes the whole ligand; using sentinel score.");
            return Ok(LIGAND_REMOVED_SCORE);
        }

        let complex = match role {
            MoleculeRole::Receptor => Complex {
                receptor: &perturbation.text,
                ligand: &ligand.text,
            },
            MoleculeRole::Ligand => Complex {
                receptor: &receptor.text,
                ligand: &perturbation.text,
            },
        };
        let score = self.scorer.score(&complex)?.value(self.baseline.target)?;
        debug!(
            unit = unit.label(),
            removed = perturbation.removed,
            score,
            "Perturbation scored."
        );
        Ok(score)
    }

    pub fn score_units(
        &mut self,
        pass: &'static str,
        role: MoleculeRole,
        units: &[StructuralUnit],
        filter: &RelevanceFilter,
    ) -> Result<PassOutcome, AttributionError> {
        let structure = self.structure(role);
        let mut accumulator =
            AttributionAccumulator::for_atoms(atom_records(&structure.text).map(|(_, r)| r.key()));

        self.reporter.report(Progress::PassStart {
            pass,
            total_units: units.len() as u64,
        });
        let mut scored = 0;
        for unit in units {
            let admitted = filter.admits(unit, &structure.molecule, self.identity(role));
            if admitted {
                let delta = self.baseline.score - self.rescore(role, unit)?;
                accumulator.credit(unit, delta);
                scored += 1;
            } else {
                trace!(unit = unit.label(), "Unit outside the binding site; skipped.");
            }
            self.reporter.report(Progress::UnitFinished { admitted });
        }
        self.reporter.report(Progress::PassFinish);

        info!(
            "{} pass on {}: scored {} of {} units.",
            pass,
            role,
            scored,
            units.len()
        );
        Ok(PassOutcome {
            attribution: accumulator.finalize(),
            units: units.len(),
            scored,
        })
    }

    #[instrument(skip_all, name = "residue_pass", fields(%role))]
    pub fn residue_pass(
        &mut self,
        role: MoleculeRole,
        filter: &RelevanceFilter,
    ) -> Result<PassOutcome, AttributionError> {
        let units = units::residue_units(&self.structure(role).text);
        self.score_units("residue", role, &units, filter)
    }

    #[instrument(skip_all, name = "atom_pass", fields(%role))]
    pub fn atom_pass(&mut self, role: MoleculeRole) -> Result<PassOutcome, AttributionError> {
        let structure = self.structure(role);
        let units = units::atom_units(&structure.molecule, self.identity(role));
        self.score_units("single-atom", role, &units, &RelevanceFilter::AdmitAll)
    }

    #[instrument(skip_all, name = "fragment_pass", fields(%role, max_size = max_size))]
    pub fn fragment_pass(
        &mut self,
        role: MoleculeRole,
        enumerator: &dyn FragmentEnumerator,
        max_size: usize,
    ) -> Result<PassOutcome, AttributionError> {
        let structure = self.structure(role);
        let units =
            units::fragment_units(&structure.molecule, self.identity(role), enumerator, max_size);
        self.score_units("fragment", role, &units, &RelevanceFilter::AdmitAll)
    }
}

impl<S: Explainer> AttributionSession<'_, S> {
    pub fn explain(
        &mut self,
        mode: ExplanationMode,
        layer_to_ignore: Option<&str>,
    ) -> Result<Explanation, AttributionError> {
        let complex = Complex {
            receptor: &self.receptor.text,
            ligand: &self.ligand.text,
        };
        let explanation = self.scorer.explain(mode, &complex, layer_to_ignore)?;
        info!(
            "{} explanation: {} receptor and {} ligand scores.",
            mode,
            explanation.receptor.len(),
            explanation.ligand.len()
        );
        Ok(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::subgraphs::ConnectedSubgraphs;
    use crate::core::io::pdbqt::read_molecule;
    use crate::core::io::pdbqt::test_lines::atom_line;
    use crate::core::models::key::SpatialKey;
    use crate::core::scoring::testing::WeightedScorer;
    use crate::engine::units::UnitKind;
    use std::collections::BTreeSet;

    fn prepared(role: MoleculeRole, lines: Vec<String>) -> PreparedStructure {
        let text = format!("ROOT\n{}\nENDROOT\nTORSDOF 0\n", lines.join("\n"));
        PreparedStructure {
            role,
            source_path: PathBuf::from(format!("{}.pdbqt", role)),
            molecule: read_molecule(&text).unwrap(),
            text,
        }
    }

    fn key(x: &str, y: &str) -> SpatialKey {
        SpatialKey::from_fields(x, y, "0.000")
    }

    // C1 - C2(-H) - C3 along x, far from the receptor atom.
    fn ligand() -> PreparedStructure {
        prepared(
            MoleculeRole::Ligand,
            vec![
                atom_line(1, "C1", 1, 0.0, 0.0, 0.0, "C"),
                atom_line(2, "C2", 1, 1.5, 0.0, 0.0, "C"),
                atom_line(3, "C3", 1, 3.0, 0.0, 0.0, "C"),
                atom_line(4, "H2", 1, 1.5, 1.0, 0.0, "H"),
            ],
        )
    }

    fn receptor() -> PreparedStructure {
        prepared(
            MoleculeRole::Receptor,
            vec![
                atom_line(1, "N", 10, 5.0, 5.0, 0.0, "N"),
                atom_line(2, "CA", 10, 6.4, 5.0, 0.0, "C"),
                atom_line(3, "N", 11, 60.0, 0.0, 0.0, "N"),
            ],
        )
    }

    // Baseline 5.0; removing C2 and its hydrogen drops the score to 3.0.
    fn scenario_scorer() -> WeightedScorer {
        WeightedScorer::new([
            (key("0.000", "0.000"), 1.5),
            (key("1.500", "0.000"), 1.5),
            (key("3.000", "0.000"), 1.5),
            (key("1.500", "1.000"), 0.5),
        ])
    }

    #[test]
    fn scorer_is_initialized_and_baseline_scored_once() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let scorer = scenario_scorer();
        let calls = scorer.calls.clone();
        let inits = scorer.initializations.clone();
        let device = scorer.last_setup.clone();

        let mut session = AttributionSession::start(
            scorer,
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup { device: Some(2) },
            &reporter,
        )
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(session.baseline().score, 5.0);

        let atoms = session.atom_pass(MoleculeRole::Ligand).unwrap();
        let fragments = session
            .fragment_pass(MoleculeRole::Ligand, &ConnectedSubgraphs, 1)
            .unwrap();

        assert_eq!(inits.get(), 1);
        assert_eq!(device.get(), Some(2));
        assert_eq!(calls.get(), 1 + atoms.scored + fragments.scored);
        assert_eq!(session.baseline().score, 5.0);

        let scorer = session.into_scorer();
        assert_eq!(scorer.calls.get(), calls.get());
        assert_eq!(scorer.initializations.get(), 1);
    }

    #[test]
    fn single_atom_removal_credits_the_full_delta() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let mut session = AttributionSession::start(
            scenario_scorer(),
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let middle = StructuralUnit::new(
            UnitKind::AtomWithSatellites,
            "C2",
            BTreeSet::from([key("1.500", "0.000")]),
            BTreeSet::from([key("1.500", "1.000")]),
        )
        .unwrap();
        assert_eq!(session.rescore(MoleculeRole::Ligand, &middle).unwrap(), 3.0);

        let outcome = session
            .score_units(
                "single-atom",
                MoleculeRole::Ligand,
                &[middle],
                &RelevanceFilter::AdmitAll,
            )
            .unwrap();
        let attribution = outcome.attribution;
        assert_eq!(attribution.get(&key("1.500", "0.000")), Some(2.0));
        assert_eq!(attribution.get(&key("0.000", "0.000")), Some(0.0));
        assert_eq!(attribution.get(&key("3.000", "0.000")), Some(0.0));
        assert_eq!(attribution.get(&key("1.500", "1.000")), Some(0.0));
    }

    #[test]
    fn atom_and_fragment_passes_distribute_differently() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let mut session = AttributionSession::start(
            scenario_scorer(),
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let pair = BTreeSet::from([key("0.000", "0.000"), key("1.500", "0.000")]);
        let satellites = BTreeSet::from([key("1.500", "1.000")]);
        let as_fragment =
            StructuralUnit::new(UnitKind::Fragment, "f", pair.clone(), satellites.clone())
                .unwrap();
        let as_whole =
            StructuralUnit::new(UnitKind::Residue, "r", pair, satellites).unwrap();

        let fragment = session
            .score_units("fragment", MoleculeRole::Ligand, &[as_fragment], &RelevanceFilter::AdmitAll)
            .unwrap()
            .attribution;
        let whole = session
            .score_units("residue", MoleculeRole::Ligand, &[as_whole], &RelevanceFilter::AdmitAll)
            .unwrap()
            .attribution;

        // Removing C1, C2 and H2 takes 3.5 off the baseline.
        assert_eq!(whole.get(&key("0.000", "0.000")), Some(3.5));
        assert_eq!(fragment.get(&key("0.000", "0.000")), Some(1.75));
        assert_ne!(whole, fragment);
    }

    #[test]
    fn overlapping_fragments_average_per_atom() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        // Weights chosen so the left pair removes 1.0 and the right pair 3.0.
        let scorer = WeightedScorer::new([
            (key("0.000", "0.000"), 1.0),
            (key("3.000", "0.000"), 3.0),
        ]);
        let mut session = AttributionSession::start(
            scorer,
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let fragment = |atoms: [&str; 2]| {
            StructuralUnit::new(
                UnitKind::Fragment,
                "f",
                atoms.iter().map(|x| key(x, "0.000")).collect(),
                BTreeSet::new(),
            )
            .unwrap()
        };
        let units = [fragment(["0.000", "1.500"]), fragment(["1.500", "3.000"])];
        let attribution = session
            .score_units("fragment", MoleculeRole::Ligand, &units, &RelevanceFilter::AdmitAll)
            .unwrap()
            .attribution;

        assert_eq!(attribution.get(&key("1.500", "0.000")), Some(1.0));
        assert_eq!(attribution.get(&key("0.000", "0.000")), Some(0.5));
        assert_eq!(attribution.get(&key("3.000", "0.000")), Some(1.5));
    }

    #[test]
    fn removing_the_whole_ligand_uses_the_sentinel() {
        let receptor = receptor();
        let ligand = prepared(
            MoleculeRole::Ligand,
            vec![atom_line(1, "C1", 1, 0.0, 0.0, 0.0, "C")],
        );
        let reporter = ProgressReporter::new();
        let scorer = WeightedScorer::new([(key("0.000", "0.000"), 4.0)]);
        let calls = scorer.calls.clone();
        let mut session = AttributionSession::start(
            scorer,
            &receptor,
            &ligand,
            ScoringTarget::Affinity,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();
        assert_eq!(session.baseline().score, 8.0);

        let outcome = session.atom_pass(MoleculeRole::Ligand).unwrap();
        assert_eq!(calls.get(), 1, "the scorer is not called for an empty ligand");
        assert_eq!(
            outcome.attribution.get(&key("0.000", "0.000")),
            Some(8.0 - LIGAND_REMOVED_SCORE)
        );
    }

    #[test]
    fn residue_pass_honours_the_binding_site() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let scorer = WeightedScorer::new([
            (SpatialKey::from_fields("5.000", "5.000", "0.000"), 0.25),
            (SpatialKey::from_fields("60.000", "0.000", "0.000"), 1.0),
        ]);
        let calls = scorer.calls.clone();
        let mut session = AttributionSession::start(
            scorer,
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let filter = RelevanceFilter::from_config(&Default::default(), &ligand.molecule);
        let outcome = session.residue_pass(MoleculeRole::Receptor, &filter).unwrap();

        assert_eq!((outcome.units, outcome.scored), (2, 1));
        assert_eq!(calls.get(), 2);
        let attribution = outcome.attribution;
        assert_eq!(
            attribution.get(&SpatialKey::from_fields("5.000", "5.000", "0.000")),
            Some(0.25)
        );
        assert_eq!(
            attribution.get(&SpatialKey::from_fields("6.400", "5.000", "0.000")),
            Some(0.25)
        );
        assert_eq!(
            attribution.get(&SpatialKey::from_fields("60.000", "0.000", "0.000")),
            Some(0.0)
        );
    }

    #[test]
    fn identity_index_is_built_once() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let session = AttributionSession::start(
            scenario_scorer(),
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let first = session.identity(MoleculeRole::Ligand) as *const AtomIdentityIndex;
        let second = session.identity(MoleculeRole::Ligand) as *const AtomIdentityIndex;
        assert_eq!(first, second);
        assert_eq!(session.identity(MoleculeRole::Ligand).len(), 4);
        assert_eq!(session.identity(MoleculeRole::Receptor).len(), 3);
    }

    #[test]
    fn dumps_unmodified_and_perturbed_structures() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let dir = tempfile::tempdir().unwrap();
        let mut session = AttributionSession::start(
            scenario_scorer(),
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();
        session.dump_perturbations(dir.path()).unwrap();
        session.atom_pass(MoleculeRole::Ligand).unwrap();

        assert!(dir.path().join("unmodified_receptor.pdbqt").exists());
        assert!(dir.path().join("unmodified_ligand.pdbqt").exists());
        let second = fs::read_to_string(dir.path().join("mod_ligand_2.pdbqt")).unwrap();
        assert!(second.starts_with("REMARK ATOMS REMOVED [2, 4]\nROOT\n"));
        assert!(dir.path().join("mod_ligand_3.pdbqt").exists());
        assert!(!dir.path().join("mod_ligand_4.pdbqt").exists());
    }

    #[test]
    fn explanation_is_delegated_whole() {
        let (receptor, ligand) = (receptor(), ligand());
        let reporter = ProgressReporter::new();
        let scorer = scenario_scorer();
        let calls = scorer.calls.clone();
        let mut session = AttributionSession::start(
            scorer,
            &receptor,
            &ligand,
            ScoringTarget::Pose,
            &ScorerSetup::default(),
            &reporter,
        )
        .unwrap();

        let explanation = session.explain(ExplanationMode::Relevance, None).unwrap();
        assert_eq!(explanation.ligand[&key("1.500", "0.000")], -1.5);
        assert!(explanation.receptor.is_empty());
        assert_eq!(calls.get(), 1);

        assert!(matches!(
            session.explain(ExplanationMode::Gradient, Some("missing_layer")),
            Err(AttributionError::Scoring { .. })
        ));
    }
}
