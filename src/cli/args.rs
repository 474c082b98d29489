use crate::error::ProbeError;
use crate::harness::HarnessConfig;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flagprobe")]
#[command(about = "Discover the command-line flags a Python script declares")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Python script to inspect
    pub script_path: PathBuf,

    /// File the captured flags are written to as JSON
    pub output_path: PathBuf,

    /// Seconds the script may run before it is killed (1-3600)
    #[arg(short = 't', long, value_parser = validate_timeout)]
    pub timeout: Option<u64>,

    /// Python interpreter used to load the script
    #[arg(short = 'p', long)]
    pub python: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Result<Self, ProbeError> {
        let cli = Self::try_parse().map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => ProbeError::InvalidArguments(e.to_string()),
        })?;

        cli.validate()?;

        Ok(cli)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.script_path.as_os_str().is_empty() {
            return Err(ProbeError::InvalidArguments(
                "Script path cannot be empty".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ProbeError::InvalidArguments(
                "Output path cannot be empty".to_string(),
            ));
        }

        if self.script_path == self.output_path {
            return Err(ProbeError::InvalidArguments(
                "Output path must differ from the script path".to_string(),
            ));
        }

        if let Some(ref python) = self.python {
            if python.trim().is_empty() {
                return Err(ProbeError::InvalidArguments(
                    "Interpreter cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Environment-derived configuration with command line options applied
    /// on top.
    pub fn harness_config(&self) -> Result<HarnessConfig, ProbeError> {
        let mut config = HarnessConfig::from_env()?;
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(ref python) = self.python {
            config = config.with_interpreter(python);
        }
        config.validate()?;
        Ok(config)
    }
}

fn validate_timeout(s: &str) -> Result<u64, String> {
    let timeout: u64 = s.parse().map_err(|_| "Timeout must be a number")?;

    if (1..=3600).contains(&timeout) {
        Ok(timeout)
    } else {
        Err("Timeout must be between 1 and 3600 seconds".to_string())
    }
}
