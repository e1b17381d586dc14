use thiserror::Error;

use super::annotate::AnnotationError;
use super::config::ConfigError;
use crate::core::io::traits::MoleculeRole;
use crate::core::scoring::ScoreError;

#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("Failed to load {role} structure: {source}")]
    Structure {
        role: MoleculeRole,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoreError,
    },

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(
        "Attribution vectors cover different atoms ({single} single-atom entries, {fragment} fragment entries)"
    )]
    MismatchedAttributions { single: usize, fragment: usize },

    #[error("Additivity log error: {0}")]
    AdditivityLog(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
