use super::accumulator::Attribution;
use crate::core::io::pdbqt::{AtomRecord, SCORE_FIELD_END, SCORE_FIELD_START};
use crate::core::scoring::ScoringTarget;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error(
        "Annotated {annotated} atoms with a nonzero score but the attribution has {expected} nonzero entries; atom identities do not match the structure"
    )]
    Consistency { expected: usize, annotated: usize },
    #[error("Failed to write annotated structure {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    Narrow,
    Extended,
}

impl FieldWidth {
    pub fn chars(self) -> usize {
        match self {
            FieldWidth::Narrow => 5,
            FieldWidth::Extended => 7,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            FieldWidth::Narrow => ".pdbqt",
            FieldWidth::Extended => ".pdbqt.ext",
        }
    }
}

pub fn format_score(score: f64, width: FieldWidth) -> String {
    let width = width.chars();
    let mut text = format!("{:.5}", score);
    text.truncate(width);
    format!("{:.>width$}", text)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationHeader {
    pub method: String,
    pub target: ScoringTarget,
    pub baseline: f64,
    pub layer_ignored: Option<String>,
    pub model: Vec<String>,
}

impl AnnotationHeader {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("REMARK VIS METHOD: {}", self.method)];
        if self.method == "masking" {
            lines.push(format!("REMARK MASKING TARGET: {}", self.target));
        } else {
            lines.push(format!(
                "REMARK LAYER IGNORED: {}",
                self.layer_ignored.as_deref().unwrap_or("")
            ));
        }
        let label = match self.target {
            ScoringTarget::Pose => "POSE SCORE",
            ScoringTarget::Affinity => "AFFINITY SCORE",
        };
        lines.push(format!("REMARK {}: {}", label, self.baseline));
        lines.extend(self.model.iter().map(|l| format!("REMARK {}", l)));
        lines
    }
}

/// Rewrites the score column of every atom record in `text`.
///
/// Atoms without an entry in `scores` are written as zero. Non-atom lines
/// are copied unchanged.
///
/// # Errors
///
/// Returns [`AnnotationError::Consistency`] when the number of atom lines
/// that received a nonzero score differs from the number of nonzero scores
/// supplied. Nothing is returned in that case.
pub fn annotate(
    text: &str,
    scores: &Attribution,
    width: FieldWidth,
) -> Result<String, AnnotationError> {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut annotated = 0;

    for line in text.lines() {
        let record = match AtomRecord::parse(line, 0) {
            Ok(Some(record)) => record,
            _ => {
                out.push_str(line);
                out.push('\n');
                continue;
            }
        };
        let score = scores.get(&record.key()).unwrap_or(0.0);
        if score != 0.0 {
            annotated += 1;
        }
        out.push_str(&substitute_score(line, &format_score(score, width)));
        out.push('\n');
    }

    let expected = scores.nonzero_count();
    if annotated != expected {
        return Err(AnnotationError::Consistency {
            expected,
            annotated,
        });
    }
    Ok(out)
}

fn substitute_score(line: &str, score: &str) -> String {
    let head = line.get(..SCORE_FIELD_START).unwrap_or(line);
    let tail = line.get(SCORE_FIELD_END..).unwrap_or("");
    format!("{:<start$}{}{}", head, score, tail, start = SCORE_FIELD_START)
}

pub fn write_annotated(
    directory: &Path,
    stem: &str,
    text: &str,
    scores: &Attribution,
    header: &AnnotationHeader,
) -> Result<Vec<PathBuf>, AnnotationError> {
    let header_text: String = header.lines().into_iter().map(|l| l + "\n").collect();
    let mut written = Vec::with_capacity(2);

    for width in [FieldWidth::Narrow, FieldWidth::Extended] {
        let body = annotate(text, scores, width)?;
        let path = directory.join(format!("{}_{}{}", header.method, stem, width.suffix()));
        fs::write(&path, format!("{}{}", header_text, body)).map_err(|source| {
            AnnotationError::Io {
                path: path.clone(),
                source,
            }
        })?;
        debug!(?path, "Annotated structure written.");
        written.push(path);
    }

    info!(
        "Wrote {} scores for '{}' ({} nonzero).",
        header.method,
        stem,
        scores.nonzero_count()
    );
    Ok(written)
}
