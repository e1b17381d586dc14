//! Deterministic in-memory scorer for tests.

use super::{Complex, Explainer, Explanation, ExplanationMode, Score, ScoreError, Scorer, ScorerSetup};
use crate::core::io::pdbqt::atom_records;
use crate::core::models::key::SpatialKey;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Scores a complex as the sum of fixed per-atom weights.
///
/// Pose is the plain sum; affinity is twice the sum. Atoms without a weight
/// contribute nothing. Every `score` call is counted.
#[derive(Debug, Clone, Default)]
pub struct WeightedScorer {
    weights: HashMap<SpatialKey, f64>,
    pub calls: Rc<Cell<usize>>,
    pub initializations: Rc<Cell<usize>>,
    pub last_setup: Rc<Cell<Option<u32>>>,
}

impl WeightedScorer {
    pub fn new(weights: impl IntoIterator<Item = (SpatialKey, f64)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
            ..Default::default()
        }
    }

    fn sum(&self, text: &str) -> f64 {
        atom_records(text)
            .map(|(_, record)| self.weights.get(&record.key()).copied().unwrap_or(0.0))
            .sum()
    }

    fn per_atom<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (SpatialKey, f64)> + 'a {
        atom_records(text).filter_map(|(_, record)| {
            let key = record.key();
            self.weights.get(&key).map(|&w| (key, w))
        })
    }
}

impl Scorer for WeightedScorer {
    fn initialize(&mut self, setup: &ScorerSetup) -> Result<(), ScoreError> {
        self.initializations.set(self.initializations.get() + 1);
        self.last_setup.set(setup.device);
        Ok(())
    }

    fn score(&mut self, complex: &Complex<'_>) -> Result<Score, ScoreError> {
        self.calls.set(self.calls.get() + 1);
        let total = self.sum(complex.receptor) + self.sum(complex.ligand);
        Ok(Score {
            pose: total,
            affinity: Some(2.0 * total),
        })
    }

    fn describe(&self) -> Vec<String> {
        vec!["MODEL: weighted-sum".to_string()]
    }
}

impl Explainer for WeightedScorer {
    fn explain(
        &mut self,
        mode: ExplanationMode,
        complex: &Complex<'_>,
        layer_to_ignore: Option<&str>,
    ) -> Result<Explanation, ScoreError> {
        if layer_to_ignore == Some("missing_layer") {
            return Err(ScoreError::Unsupported(format!(
                "{} without layer 'missing_layer'",
                mode
            )));
        }
        let sign = match mode {
            ExplanationMode::Gradient => 1.0,
            ExplanationMode::Relevance => -1.0,
        };
        Ok(Explanation {
            receptor: self
                .per_atom(complex.receptor)
                .map(|(k, w)| (k, sign * w))
                .collect(),
            ligand: self
                .per_atom(complex.ligand)
                .map(|(k, w)| (k, sign * w))
                .collect(),
        })
    }
}
