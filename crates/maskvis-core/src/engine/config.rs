use crate::core::scoring::{
    ExplanationMode, ScorerSetup, ScoringTarget, UnknownModeError, UnknownTargetError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MAX_FRAGMENT_SIZE: usize = 6;
pub const DEFAULT_BOX_HALF_WIDTH: f64 = 11.75;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error(transparent)]
    UnknownTarget(#[from] UnknownTargetError),
    #[error(transparent)]
    UnknownMode(#[from] UnknownModeError),
    #[error("Unknown removal families '{0}' (expected 'atoms-only', 'fragments-only' or 'both')")]
    UnknownRemovalFamilies(String),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalFamilies {
    AtomsOnly,
    FragmentsOnly,
    #[default]
    Both,
}

impl RemovalFamilies {
    pub fn runs_atoms(self) -> bool {
        matches!(self, RemovalFamilies::AtomsOnly | RemovalFamilies::Both)
    }

    pub fn runs_fragments(self) -> bool {
        matches!(self, RemovalFamilies::FragmentsOnly | RemovalFamilies::Both)
    }
}

impl FromStr for RemovalFamilies {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atoms-only" | "atoms" => Ok(RemovalFamilies::AtomsOnly),
            "fragments-only" | "frags-only" | "fragments" => Ok(RemovalFamilies::FragmentsOnly),
            "both" => Ok(RemovalFamilies::Both),
            _ => Err(ConfigError::UnknownRemovalFamilies(s.to_string())),
        }
    }
}

impl fmt::Display for RemovalFamilies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemovalFamilies::AtomsOnly => "atoms-only",
            RemovalFamilies::FragmentsOnly => "fragments-only",
            RemovalFamilies::Both => "both",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingSiteConfig {
    pub enabled: bool,
    pub half_width: f64,
}

impl Default for BindingSiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            half_width: DEFAULT_BOX_HALF_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub additivity_log: Option<PathBuf>,
    pub dump_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributionConfig {
    pub target: ScoringTarget,
    pub ligand_removal: RemovalFamilies,
    pub max_fragment_size: usize,
    pub binding_site: BindingSiteConfig,
    pub mask_receptor: bool,
    pub mask_ligand: bool,
    pub scorer: ScorerSetup,
    pub output: OutputConfig,
}

#[derive(Default)]
pub struct AttributionConfigBuilder {
    target: Option<ScoringTarget>,
    ligand_removal: Option<RemovalFamilies>,
    max_fragment_size: Option<usize>,
    binding_site_enabled: Option<bool>,
    box_half_width: Option<f64>,
    mask_receptor: Option<bool>,
    mask_ligand: Option<bool>,
    device: Option<u32>,
    output_directory: Option<PathBuf>,
    additivity_log: Option<PathBuf>,
    dump_directory: Option<PathBuf>,
}

impl AttributionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: ScoringTarget) -> Self {
        self.target = Some(target);
        self
    }
    pub fn ligand_removal(mut self, families: RemovalFamilies) -> Self {
        self.ligand_removal = Some(families);
        self
    }
    pub fn max_fragment_size(mut self, size: usize) -> Self {
        self.max_fragment_size = Some(size);
        self
    }
    pub fn binding_site_filter(mut self, enabled: bool) -> Self {
        self.binding_site_enabled = Some(enabled);
        self
    }
    pub fn box_size(mut self, edge: f64) -> Self {
        self.box_half_width = Some(edge / 2.0);
        self
    }
    pub fn mask_receptor(mut self, mask: bool) -> Self {
        self.mask_receptor = Some(mask);
        self
    }
    pub fn mask_ligand(mut self, mask: bool) -> Self {
        self.mask_ligand = Some(mask);
        self
    }
    pub fn device(mut self, device: Option<u32>) -> Self {
        self.device = device;
        self
    }
    pub fn output_directory(mut self, path: PathBuf) -> Self {
        self.output_directory = Some(path);
        self
    }
    pub fn additivity_log(mut self, path: Option<PathBuf>) -> Self {
        self.additivity_log = path;
        self
    }
    pub fn dump_directory(mut self, path: Option<PathBuf>) -> Self {
        self.dump_directory = path;
        self
    }

    pub fn build(self) -> Result<AttributionConfig, ConfigError> {
        let max_fragment_size = self.max_fragment_size.unwrap_or(DEFAULT_MAX_FRAGMENT_SIZE);
        if max_fragment_size == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "max_fragment_size",
                reason: "must be at least 1".into(),
            });
        }
        let half_width = self.box_half_width.unwrap_or(DEFAULT_BOX_HALF_WIDTH);
        if !(half_width.is_finite() && half_width > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "box_size",
                reason: format!("must be a positive length, got {}", half_width * 2.0),
            });
        }
        let mask_receptor = self.mask_receptor.unwrap_or(true);
        let mask_ligand = self.mask_ligand.unwrap_or(true);
        if !mask_receptor && !mask_ligand {
            return Err(ConfigError::InvalidValue {
                parameter: "mask_receptor/mask_ligand",
                reason: "at least one molecule must be masked".into(),
            });
        }

        Ok(AttributionConfig {
            target: self.target.ok_or(ConfigError::MissingParameter("target"))?,
            ligand_removal: self.ligand_removal.unwrap_or_default(),
            max_fragment_size,
            binding_site: BindingSiteConfig {
                enabled: self.binding_site_enabled.unwrap_or(true),
                half_width,
            },
            mask_receptor,
            mask_ligand,
            scorer: ScorerSetup {
                device: self.device,
            },
            output: OutputConfig {
                directory: self
                    .output_directory
                    .ok_or(ConfigError::MissingParameter("output_directory"))?,
                additivity_log: self.additivity_log,
                dump_directory: self.dump_directory,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainConfig {
    pub mode: ExplanationMode,
    pub layer_to_ignore: Option<String>,
    pub target: ScoringTarget,
    pub scorer: ScorerSetup,
    pub output_directory: PathBuf,
}

#[derive(Default)]
pub struct ExplainConfigBuilder {
    mode: Option<ExplanationMode>,
    layer_to_ignore: Option<String>,
    target: Option<ScoringTarget>,
    device: Option<u32>,
    output_directory: Option<PathBuf>,
}

impl ExplainConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: ExplanationMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn layer_to_ignore(mut self, layer: Option<String>) -> Self {
        self.layer_to_ignore = layer.filter(|l| !l.is_empty());
        self
    }
    pub fn target(mut self, target: ScoringTarget) -> Self {
        self.target = Some(target);
        self
    }
    pub fn device(mut self, device: Option<u32>) -> Self {
        self.device = device;
        self
    }
    pub fn output_directory(mut self, path: PathBuf) -> Self {
        self.output_directory = Some(path);
        self
    }

    pub fn build(self) -> Result<ExplainConfig, ConfigError> {
        Ok(ExplainConfig {
            mode: self.mode.ok_or(ConfigError::MissingParameter("mode"))?,
            layer_to_ignore: self.layer_to_ignore,
            target: self.target.unwrap_or_default(),
            scorer: ScorerSetup {
                device: self.device,
            },
            output_directory: self
                .output_directory
                .ok_or(ConfigError::MissingParameter("output_directory"))?,
        })
    }
}
