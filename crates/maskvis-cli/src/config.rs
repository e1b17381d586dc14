use crate::cli::{ExplainArgs, MaskArgs, ScorerArgs};
use crate::error::{CliError, Result};
use maskvis::core::scoring::{ExplanationMode, ScoringTarget};
use maskvis::core::scoring::command::CommandScorerConfig;
use maskvis::engine::config::{
    AttributionConfig, AttributionConfigBuilder, ConfigError, ExplainConfig, ExplainConfigBuilder,
    RemovalFamilies,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SCORER_PROGRAM: &str = "gnina";

/// Settings read from a TOML file; every field may be overridden on the
/// command line.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    target: Option<String>,
    #[serde(default)]
    masking: PartialMaskingConfig,
    #[serde(default)]
    explain: PartialExplainConfig,
    #[serde(default)]
    scorer: PartialScorerConfig,
    #[serde(default)]
    output: PartialOutputConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialMaskingConfig {
    removal_families: Option<String>,
    max_fragment_size: Option<usize>,
    box_size: Option<f64>,
    bound_check: Option<bool>,
    mask_receptor: Option<bool>,
    mask_ligand: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialExplainConfig {
    layer_to_ignore: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialScorerConfig {
    program: Option<PathBuf>,
    args: Option<Vec<String>>,
    device_args: Option<Vec<String>>,
    explain_args: Option<Vec<String>>,
    pose_key: Option<String>,
    affinity_key: Option<String>,
    device: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOutputConfig {
    directory: Option<PathBuf>,
    additivity_log: Option<PathBuf>,
    dump_directory: Option<PathBuf>,
}

impl PartialConfig {
    /// Reads the configuration file if one was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn target(&self, cli: Option<&str>) -> Result<ScoringTarget> {
        match cli.or(self.target.as_deref()) {
            Some(name) => Ok(name.parse::<ScoringTarget>().map_err(ConfigError::from)?),
            None => Ok(ScoringTarget::default()),
        }
    }

    fn output_directory(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.output.directory.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn device(&self, args: &ScorerArgs) -> Option<u32> {
        args.device.or(self.scorer.device)
    }

    fn scorer_config(&self, args: &ScorerArgs, explain_args: &[String]) -> CommandScorerConfig {
        let program = args
            .scorer
            .clone()
            .or_else(|| self.scorer.program.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORER_PROGRAM));
        let mut config = CommandScorerConfig::new(program);

        if !args.scorer_args.is_empty() {
            config.args = args.scorer_args.clone();
        } else if let Some(template) = &self.scorer.args {
            config.args = template.clone();
        }
        if let Some(template) = &self.scorer.device_args {
            config.device_args = template.clone();
        }
        if !explain_args.is_empty() {
            config.explain_args = explain_args.to_vec();
        } else if let Some(template) = &self.scorer.explain_args {
            config.explain_args = template.clone();
        }
        if let Some(key) = &self.scorer.pose_key {
            config.pose_key = key.clone();
        }
        if let Some(key) = &self.scorer.affinity_key {
            config.affinity_key = key.clone();
        }
        config
    }

    fn removal_families(&self, args: &MaskArgs) -> Result<RemovalFamilies> {
        if args.families.atoms_only {
            return Ok(RemovalFamilies::AtomsOnly);
        }
        if args.families.frags_only {
            return Ok(RemovalFamilies::FragmentsOnly);
        }
        match &self.masking.removal_families {
            Some(name) => Ok(name.parse::<RemovalFamilies>()?),
            None => Ok(RemovalFamilies::default()),
        }
    }

    /// Resolves the `mask` command's settings, command line first.
    pub fn merge_mask(&self, args: &MaskArgs) -> Result<(AttributionConfig, CommandScorerConfig)> {
        let masking = &self.masking;
        let mut builder = AttributionConfigBuilder::new()
            .target(self.target(args.complex.target.as_deref())?)
            .ligand_removal(self.removal_families(args)?)
            .binding_site_filter(!args.no_bound_check && masking.bound_check.unwrap_or(true))
            .mask_receptor(!args.skip_receptor && masking.mask_receptor.unwrap_or(true))
            .mask_ligand(!args.skip_ligand && masking.mask_ligand.unwrap_or(true))
            .device(self.device(&args.scoring))
            .output_directory(self.output_directory(args.complex.output_dir.as_deref()))
            .additivity_log(
                args.additivity
                    .clone()
                    .or_else(|| self.output.additivity_log.clone()),
            )
            .dump_directory(
                args.dump_perturbations
                    .clone()
                    .or_else(|| self.output.dump_directory.clone()),
            );
        if let Some(size) = args.max_fragment_size.or(masking.max_fragment_size) {
            builder = builder.max_fragment_size(size);
        }
        if let Some(edge) = args.box_size.or(masking.box_size) {
            builder = builder.box_size(edge);
        }

        let config = builder.build()?;
        debug!("Resolved masking configuration: {:?}", config);
        Ok((config, self.scorer_config(&args.scoring, &[])))
    }

    /// Resolves the `explain` command's settings, command line first.
    pub fn merge_explain(&self, args: &ExplainArgs) -> Result<(ExplainConfig, CommandScorerConfig)> {
        let config = ExplainConfigBuilder::new()
            .mode(args.mode.parse::<ExplanationMode>().map_err(ConfigError::from)?)
            .layer_to_ignore(
                args.layer_to_ignore
                    .clone()
                    .or_else(|| self.explain.layer_to_ignore.clone()),
            )
            .target(self.target(args.complex.target.as_deref())?)
            .device(self.device(&args.scoring))
            .output_directory(self.output_directory(args.complex.output_dir.as_deref()))
            .build()?;
        debug!("Resolved explanation configuration: {:?}", config);
        Ok((config, self.scorer_config(&args.scoring, &args.explain_args)))
    }
}
