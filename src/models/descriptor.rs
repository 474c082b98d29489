use crate::harness::{Harness, Outcome};
use crate::models::FlagManifest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A user-supplied reference to the script/operation to resolve, relative to
/// the directory it is resolved in (e.g. `train.py`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSpec(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub direction: Direction,
    pub metric: String,
}

/// A metric name and the pattern that extracts it from script output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputScalar {
    pub metric: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub op_name: String,
    pub source_path: PathBuf,
    pub output_scalar_patterns: Vec<OutputScalar>,
    pub compare_columns: Vec<String>,
    pub objective: Option<Objective>,
    pub disabled_plugins: Vec<String>,
    /// Name of the detector that claimed the script.
    pub detector: String,
    /// Filled lazily by the interception harness.
    pub flags: Option<FlagManifest>,
}

/// Operation definition assembled by an operation builder. `compare` and
/// `output_scalars` are backfilled by the owning detector when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpData {
    pub main: String,
    #[serde(default)]
    pub flags: FlagManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<Vec<String>>,
    #[serde(
        rename = "output-scalars",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_scalars: Option<Vec<OutputScalar>>,
}

impl OpSpec {
    pub fn new(spec: &str) -> Self {
        Self(spec.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Maximize => "maximize",
            Direction::Minimize => "minimize",
        }
    }
}

impl Objective {
    pub fn maximize(metric: &str) -> Self {
        Self {
            direction: Direction::Maximize,
            metric: metric.to_string(),
        }
    }
}

impl OutputScalar {
    pub fn new(metric: &str, pattern: &str) -> Self {
        Self {
            metric: metric.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

impl ModelDescriptor {
    pub fn new(op_name: String, source_path: PathBuf) -> Self {
        Self {
            op_name,
            source_path,
            output_scalar_patterns: Vec::new(),
            compare_columns: Vec::new(),
            objective: None,
            disabled_plugins: Vec::new(),
            detector: String::new(),
            flags: None,
        }
    }

    pub fn with_output_scalars(mut self, scalars: Vec<OutputScalar>) -> Self {
        self.output_scalar_patterns = scalars;
        self
    }

    pub fn with_compare_columns(mut self, columns: Vec<String>) -> Self {
        self.compare_columns = columns;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn with_disabled_plugin(mut self, plugin: &str) -> Self {
        if !self.disabled_plugins.iter().any(|p| p == plugin) {
            self.disabled_plugins.push(plugin.to_string());
        }
        self
    }

    /// Dotted module path of the script relative to the directory it was
    /// resolved in (`models/mnist.py` -> `models.mnist`), as used for
    /// `OpData::main`.
    pub fn main_module(&self) -> String {
        let relative = Path::new(&self.op_name);
        let relative = match relative.extension().and_then(|ext| ext.to_str()) {
            Some("py") => relative.with_extension(""),
            _ => relative.to_path_buf(),
        };

        let parts: Vec<&str> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            self.op_name.clone()
        } else {
            parts.join(".")
        }
    }

    /// Loads the script's flags through the harness the first time they are
    /// asked for. Returns `None` when discovery didn't capture a manifest.
    pub async fn ensure_flags(&mut self, harness: &Harness) -> Option<&FlagManifest> {
        if self.flags.is_none() {
            match harness.discover(&self.source_path).await {
                Outcome::Captured(manifest) => self.flags = Some(manifest),
                Outcome::Unsupported => {
                    tracing::debug!(op = %self.op_name, "script doesn't declare flags with argparse");
                    return None;
                }
                Outcome::Failed(e) => {
                    tracing::warn!(op = %self.op_name, "cannot import flags: {}", e);
                    return None;
                }
                Outcome::TimedOut { timeout_seconds } => {
                    tracing::warn!(
                        op = %self.op_name,
                        "cannot import flags: timed out after {} seconds",
                        timeout_seconds
                    );
                    return None;
                }
            }
        }
        self.flags.as_ref()
    }

    /// The operation definition for this descriptor, using whatever flags
    /// have been loaded so far.
    pub fn op_data(&self) -> OpData {
        OpData::new(&self.main_module())
            .with_flags(self.flags.clone().unwrap_or_default())
    }
}

impl OpData {
    pub fn new(main: &str) -> Self {
        Self {
            main: main.to_string(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: FlagManifest) -> Self {
        self.flags = flags;
        self
    }

    /// The module part of `main`; anything after whitespace is arguments.
    pub fn main_module(&self) -> Option<&str> {
        self.main.split_whitespace().next()
    }
}
