use crate::core::io::traits::PreparedStructure;
use crate::core::scoring::{Explainer, Explanation};
use crate::engine::accumulator::Attribution;
use crate::engine::annotate::{AnnotationHeader, write_annotated};
use crate::engine::config::ExplainConfig;
use crate::engine::error::AttributionError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::session::{AttributionSession, Baseline};
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ExplanationReport {
    pub baseline: Baseline,
    pub explanation: Explanation,
    pub written: Vec<PathBuf>,
}

#[instrument(skip_all, name = "explain_workflow", fields(mode = %config.mode))]
pub fn run<E: Explainer>(
    explainer: E,
    receptor: &PreparedStructure,
    ligand: &PreparedStructure,
    config: &ExplainConfig,
    reporter: &ProgressReporter,
) -> Result<ExplanationReport, AttributionError> {
    reporter.report(Progress::PhaseStart { name: "Baseline" });
    let mut session = AttributionSession::start(
        explainer,
        receptor,
        ligand,
        config.target,
        &config.scorer,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Explanation",
    });
    let explanation = session.explain(config.mode, config.layer_to_ignore.as_deref())?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Writing results",
    });
    let baseline = *session.baseline();
    let header = AnnotationHeader {
        method: config.mode.method_name().to_string(),
        target: config.target,
        baseline: baseline.score,
        layer_ignored: config.layer_to_ignore.clone(),
        model: session.scorer_description(),
    };
    fs::create_dir_all(&config.output_directory)?;

    let mut written = Vec::new();
    for (structure, scores) in [
        (receptor, &explanation.receptor),
        (ligand, &explanation.ligand),
    ] {
        let attribution = Attribution::from(scores.clone());
        written.extend(write_annotated(
            &config.output_directory,
            &structure.stem(),
            &structure.text,
            &attribution,
            &header,
        )?);
    }
    reporter.report(Progress::PhaseFinish);

    info!(
        "{} explanation written to {:?}.",
        config.mode, config.output_directory
    );
    Ok(ExplanationReport {
        baseline,
        explanation,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdbqt::PdbqtSource;
    use crate::core::models::key::SpatialKey;
    use crate::core::scoring::ExplanationMode;
    use crate::core::scoring::testing::WeightedScorer;
    use crate::engine::config::ExplainConfigBuilder;
    use crate::workflows::{fixtures, prepare_complex};

    fn scorer() -> WeightedScorer {
        WeightedScorer::new([
            (SpatialKey::from_fields("1.500", "0.000", "0.000"), 2.0),
            (SpatialKey::from_fields("4.000", "4.000", "0.000"), 0.5),
        ])
    }

    #[test]
    fn writes_explanation_for_both_molecules() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, lig) = fixtures::write_complex(dir.path());
        let (receptor, ligand) = prepare_complex(&PdbqtSource, &rec, &lig).unwrap();
        let out = dir.path().join("out");
        let config = ExplainConfigBuilder::new()
            .mode(ExplanationMode::Relevance)
            .layer_to_ignore(Some("fc1".into()))
            .output_directory(out.clone())
            .build()
            .unwrap();
        let scorer = scorer();
        let calls = scorer.calls.clone();

        let report = run(scorer, &receptor, &ligand, &config, &ProgressReporter::new()).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(report.baseline.score, 2.5);
        assert_eq!(report.written.len(), 4);
        assert_eq!(report.written[2], out.join("lrp_lig.pdbqt"));

        let text = fs::read_to_string(out.join("lrp_lig.pdbqt.ext")).unwrap();
        assert!(text.starts_with("REMARK VIS METHOD: lrp\nREMARK LAYER IGNORED: fc1\n"));
        let c2 = text
            .lines()
            .find(|l| l.starts_with("ATOM") && l.contains(" C2 "))
            .unwrap();
        assert_eq!(&c2[61..68], "-2.0000");
    }

    #[test]
    fn scorer_errors_propagate_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, lig) = fixtures::write_complex(dir.path());
        let (receptor, ligand) = prepare_complex(&PdbqtSource, &rec, &lig).unwrap();
        let config = ExplainConfigBuilder::new()
            .mode(ExplanationMode::Gradient)
            .layer_to_ignore(Some("missing_layer".into()))
            .output_directory(dir.path().join("out"))
            .build()
            .unwrap();

        let result = run(scorer(), &receptor, &ligand, &config, &ProgressReporter::new());
        assert!(matches!(result, Err(AttributionError::Scoring { .. })));
        assert!(!dir.path().join("out").exists());
    }
}
