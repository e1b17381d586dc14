use crate::core::graph::FragmentEnumerator;
use crate::core::io::traits::{MoleculeRole, PreparedStructure};
use crate::core::scoring::Scorer;
use crate::engine::accumulator::Attribution;
use crate::engine::additivity::{self, AdditivityRecord};
use crate::engine::annotate::{AnnotationHeader, write_annotated};
use crate::engine::config::AttributionConfig;
use crate::engine::error::AttributionError;
use crate::engine::filter::RelevanceFilter;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::session::{AttributionSession, Baseline, PassOutcome};
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

pub const METHOD_NAME: &str = "masking";

#[derive(Debug, Clone)]
pub struct LigandAttribution {
    pub single: Option<Attribution>,
    pub fragment: Option<Attribution>,
    pub combined: Attribution,
}

#[derive(Debug, Clone)]
pub struct MaskingReport {
    pub baseline: Baseline,
    pub receptor: Option<PassOutcome>,
    pub ligand: Option<LigandAttribution>,
    pub additivity: Option<AdditivityRecord>,
    pub written: Vec<PathBuf>,
}

#[instrument(skip_all, name = "masking_workflow")]
pub fn run<S: Scorer>(
    scorer: S,
    receptor: &PreparedStructure,
    ligand: &PreparedStructure,
    enumerator: &dyn FragmentEnumerator,
    config: &AttributionConfig,
    reporter: &ProgressReporter,
) -> Result<MaskingReport, AttributionError> {
    // === Phase 0: Baseline ===
    reporter.report(Progress::PhaseStart { name: "Baseline" });
    let mut session = AttributionSession::start(
        scorer,
        receptor,
        ligand,
        config.target,
        &config.scorer,
        reporter,
    )?;
    if let Some(dir) = &config.output.dump_directory {
        session.dump_perturbations(dir)?;
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Receptor residues near the ligand ===
    let receptor_outcome = if config.mask_receptor {
        reporter.report(Progress::PhaseStart {
            name: "Receptor masking",
        });
        let filter = RelevanceFilter::from_config(&config.binding_site, &ligand.molecule);
        if let RelevanceFilter::BindingSite(site) = &filter {
            info!(
                "Masking receptor residues within {:.2} A of ligand centroid {:?}.",
                config.binding_site.half_width,
                site.center()
            );
        }
        let outcome = session.residue_pass(MoleculeRole::Receptor, &filter)?;
        reporter.report(Progress::PhaseFinish);
        Some(outcome)
    } else {
        info!("Receptor masking skipped.");
        None
    };

    // === Phase 2: Ligand atoms and fragments ===
    let ligand_outcome = if config.mask_ligand {
        reporter.report(Progress::PhaseStart {
            name: "Ligand masking",
        });
        let single = if config.ligand_removal.runs_atoms() {
            Some(session.atom_pass(MoleculeRole::Ligand)?.attribution)
        } else {
            None
        };
        let fragment = if config.ligand_removal.runs_fragments() {
            let outcome = session.fragment_pass(
                MoleculeRole::Ligand,
                enumerator,
                config.max_fragment_size,
            )?;
            Some(outcome.attribution)
        } else {
            None
        };
        let combined =
            additivity::combine(single.as_ref(), fragment.as_ref())?.unwrap_or_default();
        reporter.report(Progress::PhaseFinish);
        Some(LigandAttribution {
            single,
            fragment,
            combined,
        })
    } else {
        info!("Ligand masking skipped.");
        None
    };

    // === Phase 3: Outputs ===
    reporter.report(Progress::PhaseStart {
        name: "Writing results",
    });
    let baseline = *session.baseline();
    let header = AnnotationHeader {
        method: METHOD_NAME.to_string(),
        target: config.target,
        baseline: baseline.score,
        layer_ignored: None,
        model: session.scorer_description(),
    };
    let directory = &config.output.directory;
    fs::create_dir_all(directory)?;

    let mut written = Vec::new();
    if let Some(outcome) = &receptor_outcome {
        written.extend(write_annotated(
            directory,
            &receptor.stem(),
            &receptor.text,
            &outcome.attribution,
            &header,
        )?);
    }
    if let Some(outcome) = &ligand_outcome {
        written.extend(write_annotated(
            directory,
            &ligand.stem(),
            &ligand.text,
            &outcome.combined,
            &header,
        )?);
    }

    let additivity = match (&config.output.additivity_log, &ligand_outcome) {
        (Some(log), Some(outcome)) => {
            let record = AdditivityRecord::compute(
                &ligand.source_path,
                baseline.score,
                outcome.single.as_ref(),
                outcome.fragment.as_ref(),
                &ligand.molecule,
            )?;
            record.append_to(log)?;
            Some(record)
        }
        (Some(log), None) => {
            warn!(
                "Additivity log {:?} requested but the ligand was not masked; nothing appended.",
                log
            );
            None
        }
        (None, _) => None,
    };
    reporter.report(Progress::PhaseFinish);

    info!("Masking finished: {} annotated files written.", written.len());
    Ok(MaskingReport {
        baseline,
        receptor: receptor_outcome,
        ligand: ligand_outcome,
        additivity,
        written,
    })
}
