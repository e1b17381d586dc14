use crate::cli::MaskArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use maskvis::{
    core::graph::subgraphs::ConnectedSubgraphs,
    core::io::pdbqt::PdbqtSource,
    core::scoring::command::CommandScorer,
    engine::progress::ProgressReporter,
    workflows::{self, mask::MaskingReport},
};
use tracing::info;

pub fn run(args: MaskArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.complex.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let (config, scorer_config) = partial_config.merge_mask(&args)?;

    info!(
        "Loading receptor {:?} and ligand {:?}",
        &args.complex.receptor, &args.complex.ligand
    );
    let (receptor, ligand) =
        workflows::prepare_complex(&PdbqtSource, &args.complex.receptor, &args.complex.ligand)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let scorer = CommandScorer::new(scorer_config);
    println!("Starting masking attribution...");
    info!(
        "Invoking the masking workflow with scorer {:?}",
        scorer.config().program
    );
    let report = workflows::mask::run(
        scorer,
        &receptor,
        &ligand,
        &ConnectedSubgraphs,
        &config,
        &reporter,
    )?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &MaskingReport) {
    println!(
        "Baseline {} score: {:.5}",
        report.baseline.target, report.baseline.score
    );
    if let Some(outcome) = &report.receptor {
        println!(
            "  Receptor: {} of {} residues scored, {} atoms credited",
            outcome.scored,
            outcome.units,
            outcome.attribution.nonzero_count()
        );
    }
    if let Some(ligand) = &report.ligand {
        println!(
            "  Ligand: {} atoms credited",
            ligand.combined.nonzero_count()
        );
    }
    if let Some(record) = &report.additivity {
        println!(
            "  Additivity: single-atom total {:.5}, fragment total {:.5}",
            record.single_total, record.fragment_total
        );
    }
    for path in &report.written {
        println!("✓ Written: {}", path.display());
    }
}
