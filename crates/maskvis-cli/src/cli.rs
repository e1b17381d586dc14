use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "maskvis - per-atom attribution for receptor-ligand scoring functions by masking atoms, fragments and residues.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attribute the score to atoms by removing them and rescoring.
    Mask(MaskArgs),
    /// Let the scorer explain itself with gradients or relevance propagation.
    Explain(ExplainArgs),
}

/// Inputs and outputs shared by every subcommand.
#[derive(Args, Debug)]
pub struct ComplexArgs {
    /// Receptor structure (PDBQT).
    #[arg(short, long, value_name = "PATH")]
    pub receptor: PathBuf,

    /// Ligand structure (PDBQT).
    #[arg(short, long, value_name = "PATH")]
    pub ligand: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for annotated structures. Defaults to the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Score to explain: 'pose' or 'affinity'.
    #[arg(short, long, value_name = "TARGET")]
    pub target: Option<String>,
}

/// How the external scorer is invoked.
#[derive(Args, Debug)]
pub struct ScorerArgs {
    /// Scoring program, run once per evaluation.
    #[arg(long, value_name = "PROGRAM")]
    pub scorer: Option<PathBuf>,

    /// Replace the scorer's argument template. Repeat for each argument;
    /// '{receptor}' and '{ligand}' are substituted with file paths.
    #[arg(long = "scorer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub scorer_args: Vec<String>,

    /// Accelerator device index passed to the scorer.
    #[arg(long, value_name = "INDEX")]
    pub device: Option<u32>,
}

/// Arguments for the `mask` subcommand.
#[derive(Args, Debug)]
pub struct MaskArgs {
    #[command(flatten)]
    pub complex: ComplexArgs,

    #[command(flatten)]
    pub scoring: ScorerArgs,

    /// Restrict ligand masking to one removal family.
    #[command(flatten)]
    pub families: RemovalFamilyFlags,

    /// Largest ligand fragment, in bonds.
    #[arg(long, value_name = "INT")]
    pub max_fragment_size: Option<usize>,

    /// Edge length of the binding-site box around the ligand, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub box_size: Option<f64>,

    /// Mask every receptor residue, however far from the ligand.
    #[arg(long)]
    pub no_bound_check: bool,

    /// Do not mask the receptor.
    #[arg(long, conflicts_with = "skip_ligand")]
    pub skip_receptor: bool,

    /// Do not mask the ligand.
    #[arg(long)]
    pub skip_ligand: bool,

    /// Append an additivity record for this complex to the given log.
    #[arg(long, value_name = "PATH")]
    pub additivity: Option<PathBuf>,

    /// Write every perturbed structure into the given directory.
    #[arg(long, value_name = "DIR")]
    pub dump_perturbations: Option<PathBuf>,
}

/// Mutually exclusive switches selecting one ligand removal family.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct RemovalFamilyFlags {
    /// Only remove single heavy atoms (with their hydrogens).
    #[arg(long)]
    pub atoms_only: bool,
    /// Only remove bond fragments.
    #[arg(long)]
    pub frags_only: bool,
}

/// Arguments for the `explain` subcommand.
#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub complex: ComplexArgs,

    #[command(flatten)]
    pub scoring: ScorerArgs,

    /// Explanation method: 'gradient' or 'lrp'.
    #[arg(short, long, value_name = "MODE")]
    pub mode: String,

    /// Model layer to leave out of the propagation.
    #[arg(long, value_name = "NAME")]
    pub layer_to_ignore: Option<String>,

    /// Replace the scorer's explanation argument template. Repeat for each
    /// argument; '{mode}' and '{layer}' are substituted as well.
    #[arg(long = "explain-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub explain_args: Vec<String>,
}
