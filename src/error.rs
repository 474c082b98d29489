use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Parse error: Failed to parse script {path}: {detail}")]
    ParseError { path: PathBuf, detail: String },

    #[error("{path} doesn't use argparse - cannot import flags")]
    Unsupported { path: PathBuf },

    #[error("Script {path} failed before its flags were captured: {message}")]
    ExecutionFailure { path: PathBuf, message: String },

    #[error("Script {path} exited without parsing its arguments - manifest never finalized")]
    ManifestNeverFinalized { path: PathBuf },

    #[error("Script {path} timed out after {timeout} seconds")]
    TimedOut { path: PathBuf, timeout: u64 },

    #[error("Module '{module}' not found in {dir}")]
    ModuleNotFound { module: String, dir: PathBuf },

    #[error("Failed to write flags to {path}: {source}")]
    ManifestWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No detector claims operation '{opspec}'")]
    NotApplicable { opspec: String },

    #[error("Interpreter not found: {command}")]
    InterpreterNotFound { command: String },

    #[error("Invalid command line arguments: {0}")]
    InvalidArguments(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
