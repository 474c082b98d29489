//! The parser-construction seam.
//!
//! Discovery observes a script through two calls: option registration and
//! parse invocation. `RecordingSeam` is the implementation injected for one
//! discovery invocation; it owns that invocation's manifest and nothing else
//! shares it.

use crate::models::{FlagManifest, FlagRecordBuilder, OptionObservation};
use serde::{Deserialize, Serialize};

/// What the caller of `parse_and_run` should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeamControl {
    Continue,
    Halt,
}

pub trait ParserSeam {
    fn register_option(&mut self, observation: OptionObservation);
    fn parse_and_run(&mut self) -> SeamControl;
}

/// An event reported by the in-process adapter, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SeamEvent {
    Register { option: OptionObservation },
    Parse,
    Error { error_type: String, message: String },
}

/// Per-invocation state threaded through the seam.
#[derive(Debug, Default)]
pub struct InvocationContext {
    manifest: FlagManifest,
    registrations: usize,
    finalized: bool,
}

#[derive(Debug, Default)]
pub struct RecordingSeam {
    context: InvocationContext,
}

/// How a replayed event stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEnd {
    Finalized,
    Raised { error_type: String, message: String },
    Unfinished,
}

impl InvocationContext {
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl RecordingSeam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    /// The captured manifest, available only once the parse seam fired.
    pub fn finish(self) -> Option<FlagManifest> {
        if self.context.finalized {
            Some(self.context.manifest)
        } else {
            None
        }
    }
}

impl ParserSeam for RecordingSeam {
    fn register_option(&mut self, observation: OptionObservation) {
        if self.context.finalized {
            return;
        }
        self.context.registrations += 1;
        tracing::debug!(options = ?observation.option_strings, "handling add_argument");
        if let Some(spec) = FlagRecordBuilder::build(&observation) {
            tracing::debug!(flag = %spec.name, "added flag");
            self.context.manifest.insert(spec);
        }
    }

    fn parse_and_run(&mut self) -> SeamControl {
        self.context.finalized = true;
        tracing::debug!(
            flags = self.context.manifest.len(),
            "parse intercepted - finalizing manifest"
        );
        SeamControl::Halt
    }
}

/// Feeds adapter events into `seam` until the seam halts or the stream ends.
pub fn replay<S, I>(events: I, seam: &mut S) -> ReplayEnd
where
    S: ParserSeam,
    I: IntoIterator<Item = SeamEvent>,
{
    for event in events {
        match event {
            SeamEvent::Register { option } => seam.register_option(option),
            SeamEvent::Parse => {
                if seam.parse_and_run() == SeamControl::Halt {
                    return ReplayEnd::Finalized;
                }
            }
            SeamEvent::Error {
                error_type,
                message,
            } => return ReplayEnd::Raised {
                error_type,
                message,
            },
        }
    }
    ReplayEnd::Unfinished
}

/// Parses the adapter's event channel. A partial trailing line (left by a
/// killed process) is skipped.
pub fn parse_events(channel: &str) -> Vec<SeamEvent> {
    channel
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("skipping malformed seam event: {}", e);
                None
            }
        })
        .collect()
}
