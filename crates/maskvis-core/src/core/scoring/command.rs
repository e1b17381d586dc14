use super::{Complex, Explainer, Explanation, ExplanationMode, Score, ScoreError, Scorer, ScorerSetup};
use crate::core::models::key::SpatialKey;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, trace};

const RECEPTOR_PLACEHOLDER: &str = "{receptor}";
const LIGAND_PLACEHOLDER: &str = "{ligand}";
const DEVICE_PLACEHOLDER: &str = "{device}";
const MODE_PLACEHOLDER: &str = "{mode}";
const LAYER_PLACEHOLDER: &str = "{layer}";

/// How to invoke an external scoring program.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandScorerConfig {
    /// Program to run for every evaluation.
    pub program: PathBuf,
    /// Arguments for scoring; `{receptor}` and `{ligand}` are replaced by
    /// paths of temporary PDBQT files.
    pub args: Vec<String>,
    /// Arguments appended when a device is selected; `{device}` is replaced
    /// by the device index.
    pub device_args: Vec<String>,
    /// Arguments for explanations; additionally supports `{mode}` and
    /// `{layer}`. Empty when the program cannot explain.
    pub explain_args: Vec<String>,
    /// Output label of the pose score (`<label>: <value>`).
    pub pose_key: String,
    /// Output label of the affinity (`<label>: <value>`).
    pub affinity_key: String,
}

impl CommandScorerConfig {
    /// Defaults matching a gnina-style `--score_only` invocation.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "-r".into(),
                RECEPTOR_PLACEHOLDER.into(),
                "-l".into(),
                LIGAND_PLACEHOLDER.into(),
                "--score_only".into(),
            ],
            device_args: vec!["--device".into(), DEVICE_PLACEHOLDER.into()],
            explain_args: Vec::new(),
            pose_key: "CNNscore".into(),
            affinity_key: "CNNaffinity".into(),
        }
    }
}

/// Scorer backed by an external program, run once per evaluation.
///
/// The perturbed structures are written to a scratch directory created at
/// initialization and reused for every call.
#[derive(Debug)]
pub struct CommandScorer {
    config: CommandScorerConfig,
    device: Option<u32>,
    scratch: Option<TempDir>,
}

impl CommandScorer {
    pub fn new(config: CommandScorerConfig) -> Self {
        Self {
            config,
            device: None,
            scratch: None,
        }
    }

    pub fn config(&self) -> &CommandScorerConfig {
        &self.config
    }

    fn write_complex(&self, complex: &Complex<'_>) -> Result<(PathBuf, PathBuf), ScoreError> {
        let dir = self.scratch.as_ref().ok_or(ScoreError::NotInitialized)?;
        let receptor = dir.path().join("receptor.pdbqt");
        let ligand = dir.path().join("ligand.pdbqt");
        fs::write(&receptor, complex.receptor)?;
        fs::write(&ligand, complex.ligand)?;
        Ok((receptor, ligand))
    }

    fn expand(
        &self,
        template: &[String],
        receptor: &Path,
        ligand: &Path,
        extra: &[(&str, &str)],
    ) -> Vec<String> {
        let receptor = receptor.to_string_lossy();
        let ligand = ligand.to_string_lossy();
        let device = self.device.map(|d| d.to_string());

        let mut args: Vec<String> = template.to_vec();
        if let Some(device) = &device {
            args.extend(
                self.config
                    .device_args
                    .iter()
                    .map(|a| a.replace(DEVICE_PLACEHOLDER, device)),
            );
        }
        args.into_iter()
            .map(|arg| {
                let mut arg = arg
                    .replace(RECEPTOR_PLACEHOLDER, &receptor)
                    .replace(LIGAND_PLACEHOLDER, &ligand);
                for (placeholder, value) in extra {
                    arg = arg.replace(placeholder, value);
                }
                arg
            })
            .collect()
    }

    fn run(&self, args: &[String]) -> Result<String, ScoreError> {
        trace!(program = ?self.config.program, ?args, "Running scorer.");
        let output = Command::new(&self.config.program).args(args).output()?;
        if !output.status.success() {
            return Err(ScoreError::Process {
                program: self.config.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Finds `<key>: <value>` in program output; the last occurrence wins.
fn labelled_value(output: &str, key: &str) -> Result<Option<f64>, ScoreError> {
    let mut found = None;
    for line in output.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        if label.trim() != key {
            continue;
        }
        let raw = value.split_whitespace().next().unwrap_or("");
        let parsed = raw.parse::<f64>().map_err(|_| ScoreError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
        found = Some(parsed);
    }
    Ok(found)
}

/// Parses `REC|LIG x y z value` lines into per-molecule maps.
fn parse_explanation(output: &str) -> Result<Explanation, ScoreError> {
    let mut explanation = Explanation::default();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let target = match fields.first() {
            Some(&"REC") => &mut explanation.receptor,
            Some(&"LIG") => &mut explanation.ligand,
            _ => continue,
        };
        let [_, x, y, z, value] = fields[..] else {
            return Err(ScoreError::InvalidValue {
                key: "explanation line".into(),
                value: line.to_string(),
            });
        };
        let score = value.parse::<f64>().map_err(|_| ScoreError::InvalidValue {
            key: SpatialKey::from_fields(x, y, z).to_string(),
            value: value.to_string(),
        })?;
        target.insert(SpatialKey::from_fields(x, y, z), score);
    }
    Ok(explanation)
}

impl Scorer for CommandScorer {
    fn initialize(&mut self, setup: &ScorerSetup) -> Result<(), ScoreError> {
        self.device = setup.device;
        self.scratch = Some(tempfile::Builder::new().prefix("maskvis-").tempdir()?);
        debug!(
            program = ?self.config.program,
            device = ?self.device,
            "External scorer initialized."
        );
        Ok(())
    }

    fn score(&mut self, complex: &Complex<'_>) -> Result<Score, ScoreError> {
        let (receptor, ligand) = self.write_complex(complex)?;
        let args = self.expand(&self.config.args, &receptor, &ligand, &[]);
        let output = self.run(&args)?;

        let pose = labelled_value(&output, &self.config.pose_key)?
            .ok_or_else(|| ScoreError::MissingValue(self.config.pose_key.clone()))?;
        let affinity = labelled_value(&output, &self.config.affinity_key)?;
        Ok(Score { pose, affinity })
    }

    fn describe(&self) -> Vec<String> {
        vec![format!(
            "MODEL: {} {}",
            self.config.program.display(),
            self.config.args.join(" ")
        )]
    }
}

impl Explainer for CommandScorer {
    fn explain(
        &mut self,
        mode: ExplanationMode,
        complex: &Complex<'_>,
        layer_to_ignore: Option<&str>,
    ) -> Result<Explanation, ScoreError> {
        if self.config.explain_args.is_empty() {
            return Err(ScoreError::Unsupported(format!(
                "'{}' explanation: no explain arguments configured",
                mode
            )));
        }
        let (receptor, ligand) = self.write_complex(complex)?;
        let args = self.expand(
            &self.config.explain_args,
            &receptor,
            &ligand,
            &[
                (MODE_PLACEHOLDER, mode.method_name()),
                (LAYER_PLACEHOLDER, layer_to_ignore.unwrap_or("")),
            ],
        );
        let output = self.run(&args)?;
        parse_explanation(&output)
    }
}
