pub mod cli;
pub mod error;
pub mod harness;
pub mod logging;
pub mod models;
pub mod parser;
pub mod plugins;

pub use error::ProbeError;

// Re-export commonly used types
pub use models::{
    FlagManifest, FlagSpec, ModelDescriptor, OpData, OpSpec, OptionObservation, Script,
    ScriptAnalysis,
};

pub use harness::{Harness, HarnessConfig, Outcome, Phase};
pub use parser::ScriptAnalyzer;
pub use plugins::{find_module, DetectorRegistry};

pub use cli::CliHandler;

use std::path::Path;

/// Discovers the flags `script` declares using the default harness
/// configuration with environment overrides applied.
pub async fn discover_flags(script: &Path) -> Outcome {
    match HarnessConfig::from_env() {
        Ok(config) => Harness::new(config).discover(script).await,
        Err(e) => Outcome::Failed(e),
    }
}

/// Resolves `opspec` relative to `dir` against the built-in detectors.
pub fn resolve(opspec: &OpSpec, dir: &Path) -> Result<ModelDescriptor, ProbeError> {
    DetectorRegistry::builtin().resolve(opspec, dir)
}
