use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_PARSER_MODULE: &str = "argparse";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

pub const INTERPRETER_ENV: &str = "FLAGPROBE_PYTHON";
pub const TIMEOUT_ENV: &str = "FLAGPROBE_TIMEOUT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub interpreter: String,
    /// Command line handed to the target after its own path.
    pub synthetic_args: Vec<String>,
    /// Module a script must import for discovery to be attempted.
    pub parser_module: String,
    pub working_dir: Option<PathBuf>,
    pub env_vars: HashMap<String, String>,
    pub timeout_seconds: u64,
    pub max_concurrent: usize,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            synthetic_args: vec!["--help".to_string()],
            parser_module: DEFAULT_PARSER_MODULE.to_string(),
            working_dir: None,
            env_vars: HashMap::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Defaults overridden by `FLAGPROBE_PYTHON` and `FLAGPROBE_TIMEOUT`.
    pub fn from_env() -> Result<Self, ProbeError> {
        let mut config = Self::new();

        if let Ok(interpreter) = std::env::var(INTERPRETER_ENV) {
            if !interpreter.trim().is_empty() {
                config.interpreter = interpreter;
            }
        }

        if let Ok(timeout_str) = std::env::var(TIMEOUT_ENV) {
            let timeout = timeout_str.trim().parse::<u64>().map_err(|_| {
                ProbeError::ConfigError(format!(
                    "{} must be a number of seconds, got '{}'",
                    TIMEOUT_ENV, timeout_str
                ))
            })?;
            config.timeout_seconds = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_env_var(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }

    pub fn with_synthetic_args(mut self, args: Vec<String>) -> Self {
        self.synthetic_args = args;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.interpreter.trim().is_empty() {
            return Err(ProbeError::ConfigError(
                "Interpreter cannot be empty".to_string(),
            ));
        }

        if self.parser_module.trim().is_empty() {
            return Err(ProbeError::ConfigError(
                "Parser module cannot be empty".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(ProbeError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(ProbeError::ConfigError(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}
