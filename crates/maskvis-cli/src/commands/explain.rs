use crate::cli::ExplainArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use maskvis::{
    core::io::pdbqt::PdbqtSource, core::scoring::command::CommandScorer,
    engine::progress::ProgressReporter, workflows,
};
use tracing::info;

pub fn run(args: ExplainArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.complex.config.as_deref())?;
    let (config, scorer_config) = partial_config.merge_explain(&args)?;

    let (receptor, ligand) =
        workflows::prepare_complex(&PdbqtSource, &args.complex.receptor, &args.complex.ligand)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Requesting {} explanation...", config.mode);
    let report = workflows::explain::run(
        CommandScorer::new(scorer_config),
        &receptor,
        &ligand,
        &config,
        &reporter,
    )?;
    info!(
        receptor_atoms = report.explanation.receptor.len(),
        ligand_atoms = report.explanation.ligand.len(),
        "Explanation received."
    );

    println!(
        "Baseline {} score: {:.5}",
        report.baseline.target, report.baseline.score
    );
    for path in &report.written {
        println!("✓ Written: {}", path.display());
    }
    Ok(())
}
