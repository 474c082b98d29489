// Harness module - discovers flags by running a script up to its argument parse

pub mod config;
pub mod invocation;
pub mod runner;
pub mod seam;

pub use config::HarnessConfig;
pub use invocation::{write_manifest, Harness, Outcome, Phase};
pub use runner::{RunOutput, ScriptRunner};
pub use seam::{
    parse_events, replay, InvocationContext, ParserSeam, RecordingSeam, ReplayEnd, SeamControl,
    SeamEvent,
};
