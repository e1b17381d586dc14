//! Interfaces to the external predictive scorer.
//!
//! The scorer is a black box: it receives a receptor and a ligand as PDBQT
//! text and returns a pose confidence and, when available, a binding
//! affinity. Gradient- and relevance-based explanations are delegated to it
//! whole through [`Explainer`].

pub mod command;
#[cfg(test)]
pub(crate) mod testing;

use crate::core::models::key::SpatialKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("I/O error while scoring: {0}")]
    Io(#[from] io::Error),
    #[error("Scorer '{program}' exited with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Scorer output has no value for '{0}'")]
    MissingValue(String),
    #[error("Scorer output has an invalid value for '{key}': '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("Scorer used before initialization")]
    NotInitialized,
    #[error("Operation not supported by this scorer: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown scoring target '{0}' (expected 'pose' or 'affinity')")]
pub struct UnknownTargetError(pub String);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown explanation mode '{0}' (expected 'gradient' or 'lrp')")]
pub struct UnknownModeError(pub String);

/// Which scorer output an attribution run explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringTarget {
    /// Pose confidence.
    #[default]
    Pose,
    /// Predicted binding affinity.
    Affinity,
}

impl FromStr for ScoringTarget {
    type Err = UnknownTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pose" => Ok(ScoringTarget::Pose),
            "affinity" => Ok(ScoringTarget::Affinity),
            _ => Err(UnknownTargetError(s.to_string())),
        }
    }
}

impl fmt::Display for ScoringTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoringTarget::Pose => "pose",
            ScoringTarget::Affinity => "affinity",
        })
    }
}

/// A receptor-ligand complex as the scorer receives it.
#[derive(Debug, Clone, Copy)]
pub struct Complex<'a> {
    pub receptor: &'a str,
    pub ligand: &'a str,
}

/// One scorer evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub pose: f64,
    pub affinity: Option<f64>,
}

impl Score {
    /// The scalar the configured target explains.
    pub fn value(&self, target: ScoringTarget) -> Result<f64, ScoreError> {
        match target {
            ScoringTarget::Pose => Ok(self.pose),
            ScoringTarget::Affinity => self
                .affinity
                .ok_or_else(|| ScoreError::MissingValue("affinity".into())),
        }
    }
}

/// Session-wide scorer settings, applied once before the first score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScorerSetup {
    /// Accelerator device index, if the scorer should use one.
    pub device: Option<u32>,
}

/// A predictive scoring function.
///
/// Implementations may hold expensive state (a loaded model, a worker
/// process); the attribution session owns one instance for its whole
/// lifetime and calls [`Scorer::initialize`] exactly once before scoring.
pub trait Scorer {
    /// One-time setup. The default does nothing.
    fn initialize(&mut self, _setup: &ScorerSetup) -> Result<(), ScoreError> {
        Ok(())
    }

    /// Scores a complex. Blocking; there is no timeout.
    fn score(&mut self, complex: &Complex<'_>) -> Result<Score, ScoreError>;

    /// Lines describing the model, written into annotated file headers.
    fn describe(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Explanation methods that the scorer computes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplanationMode {
    /// Input-gradient saliency.
    #[serde(rename = "gradient")]
    Gradient,
    /// Layer-wise relevance propagation.
    #[serde(rename = "lrp")]
    Relevance,
}

impl ExplanationMode {
    /// Method name used for output files and headers.
    pub fn method_name(self) -> &'static str {
        match self {
            ExplanationMode::Gradient => "gradient",
            ExplanationMode::Relevance => "lrp",
        }
    }
}

impl FromStr for ExplanationMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gradient" => Ok(ExplanationMode::Gradient),
            "lrp" | "relevance" => Ok(ExplanationMode::Relevance),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

impl fmt::Display for ExplanationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Per-atom scores returned by an explanation, keyed by spatial key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Explanation {
    pub receptor: BTreeMap<SpatialKey, f64>,
    pub ligand: BTreeMap<SpatialKey, f64>,
}

/// A scorer that can also explain its own output.
pub trait Explainer: Scorer {
    /// Computes per-atom scores for `complex` in one call.
    ///
    /// `layer_to_ignore` names a model layer to exclude from propagation.
    fn explain(
        &mut self,
        mode: ExplanationMode,
        complex: &Complex<'_>,
        layer_to_ignore: Option<&str>,
    ) -> Result<Explanation, ScoreError>;
}
