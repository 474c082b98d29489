use crate::error::ProbeError;
use crate::harness::config::HarnessConfig;
use crate::harness::runner::{RunOutput, ScriptRunner};
use crate::harness::seam::{replay, RecordingSeam, ReplayEnd, SeamEvent};
use crate::models::FlagManifest;
use crate::parser::ScriptAnalyzer;
use futures::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PreconditionChecked,
    Executing,
    Captured,
    Failed,
    TimedOut,
    Unsupported,
}

/// Terminal result of one discovery invocation.
#[derive(Debug)]
pub enum Outcome {
    Captured(FlagManifest),
    Unsupported,
    Failed(ProbeError),
    TimedOut { timeout_seconds: u64 },
}

/// One discovery invocation walking `Idle -> PreconditionChecked ->
/// Executing -> terminal`.
struct Invocation {
    script: PathBuf,
    phase: Phase,
}

pub struct Harness {
    config: HarnessConfig,
    analyzer: ScriptAnalyzer,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::PreconditionChecked => "precondition-checked",
            Phase::Executing => "executing",
            Phase::Captured => "captured",
            Phase::Failed => "failed",
            Phase::TimedOut => "timed-out",
            Phase::Unsupported => "unsupported",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Captured | Phase::Failed | Phase::TimedOut | Phase::Unsupported
        )
    }

    /// `Idle -> Failed` covers scripts that can't be read or parsed for the
    /// precondition check.
    pub fn can_advance_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::PreconditionChecked)
                | (Phase::Idle, Phase::Failed)
                | (Phase::PreconditionChecked, Phase::Executing)
                | (Phase::PreconditionChecked, Phase::Unsupported)
                | (Phase::Executing, Phase::Captured)
                | (Phase::Executing, Phase::Failed)
                | (Phase::Executing, Phase::TimedOut)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const EXIT_CAPTURED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_NOT_SUPPORTED: i32 = 3;
pub const EXIT_TIMED_OUT: i32 = 4;

impl Outcome {
    pub fn phase(&self) -> Phase {
        match self {
            Outcome::Captured(_) => Phase::Captured,
            Outcome::Unsupported => Phase::Unsupported,
            Outcome::Failed(_) => Phase::Failed,
            Outcome::TimedOut { .. } => Phase::TimedOut,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Captured(_) => EXIT_CAPTURED,
            Outcome::Unsupported => EXIT_NOT_SUPPORTED,
            Outcome::Failed(_) => EXIT_FAILED,
            Outcome::TimedOut { .. } => EXIT_TIMED_OUT,
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self, Outcome::Captured(_))
    }

    pub fn manifest(&self) -> Option<&FlagManifest> {
        match self {
            Outcome::Captured(manifest) => Some(manifest),
            _ => None,
        }
    }

    pub fn into_manifest(self) -> Option<FlagManifest> {
        match self {
            Outcome::Captured(manifest) => Some(manifest),
            _ => None,
        }
    }
}

impl Invocation {
    fn new(script: &Path) -> Self {
        Self {
            script: script.to_path_buf(),
            phase: Phase::Idle,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(script = %self.script.display(), from = %self.phase, to = %next, "invocation phase");
        self.phase = next;
    }

    fn settle(mut self, outcome: Outcome) -> Outcome {
        self.advance(outcome.phase());
        outcome
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            analyzer: ScriptAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Discovers the flags `script` declares by running it up to its first
    /// argument parse.
    pub async fn discover(&self, script: &Path) -> Outcome {
        let mut invocation = Invocation::new(script);

        let analysis = match self.analyzer.analyze_path(script) {
            Ok(analysis) => analysis,
            Err(e) => return invocation.settle(Outcome::Failed(e)),
        };
        invocation.advance(Phase::PreconditionChecked);

        if !analysis.imports.references(&self.config.parser_module) {
            tracing::info!(
                "{} doesn't use {} - cannot import flags",
                script.display(),
                self.config.parser_module
            );
            return invocation.settle(Outcome::Unsupported);
        }

        invocation.advance(Phase::Executing);
        let target = std::fs::canonicalize(script).unwrap_or_else(|_| script.to_path_buf());
        let runner = ScriptRunner::new(self.config.clone());
        let outcome = match runner.run(&target).await {
            Ok(RunOutput::Exited {
                exit_code,
                events,
                stderr,
            }) => settle_events(script, events, exit_code, stderr),
            Ok(RunOutput::TimedOut) => Outcome::TimedOut {
                timeout_seconds: self.config.timeout_seconds,
            },
            Err(e) => Outcome::Failed(e),
        };

        invocation.settle(outcome)
    }

    /// Like `discover`, additionally writing a captured manifest to `output`.
    /// Nothing is written for any other outcome.
    pub async fn discover_to(&self, script: &Path, output: &Path) -> Outcome {
        let outcome = self.discover(script).await;
        if let Outcome::Captured(ref manifest) = outcome {
            tracing::debug!(
                "writing flags to {}: {}",
                output.display(),
                manifest.names().collect::<Vec<_>>().join(", ")
            );
            if let Err(e) = write_manifest(manifest, output) {
                return Outcome::Failed(e);
            }
        }
        outcome
    }

    /// Discovers several scripts, running at most `max_concurrent`
    /// invocations at a time. Results are in input order.
    pub async fn discover_all(&self, scripts: &[PathBuf]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(scripts.len());
        for chunk in scripts.chunks(self.config.max_concurrent) {
            let batch: Vec<_> = chunk.iter().map(|script| self.discover(script)).collect();
            outcomes.extend(join_all(batch).await);
        }
        outcomes
    }
}

fn settle_events(
    script: &Path,
    events: Vec<SeamEvent>,
    exit_code: Option<i32>,
    stderr: String,
) -> Outcome {
    let mut seam = RecordingSeam::new();
    match replay(events, &mut seam) {
        ReplayEnd::Finalized => match seam.finish() {
            Some(manifest) => Outcome::Captured(manifest),
            None => Outcome::Failed(ProbeError::ManifestNeverFinalized {
                path: script.to_path_buf(),
            }),
        },
        ReplayEnd::Raised {
            error_type,
            message,
        } => Outcome::Failed(ProbeError::ExecutionFailure {
            path: script.to_path_buf(),
            message: format!("{}: {}", error_type, message),
        }),
        // The adapter itself died, e.g. the interpreter is too old to run it
        ReplayEnd::Unfinished if exit_code != Some(0) && !stderr.is_empty() => {
            Outcome::Failed(ProbeError::ExecutionFailure {
                path: script.to_path_buf(),
                message: stderr,
            })
        }
        ReplayEnd::Unfinished => Outcome::Failed(ProbeError::ManifestNeverFinalized {
            path: script.to_path_buf(),
        }),
    }
}

pub fn write_manifest(manifest: &FlagManifest, output: &Path) -> Result<(), ProbeError> {
    let json = manifest.to_json()?;
    std::fs::write(output, json).map_err(|source| ProbeError::ManifestWriteFailure {
        path: output.to_path_buf(),
        source,
    })
}
