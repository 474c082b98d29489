pub mod args;

pub use args::Cli;

use crate::error::ProbeError;
use crate::harness::{Harness, Outcome};

pub struct CliHandler {
    cli: Cli,
}

impl CliHandler {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Runs one discovery and returns the process exit code for its outcome.
    pub async fn run(&self) -> Result<i32, ProbeError> {
        let config = self.cli.harness_config()?;
        tracing::debug!(
            interpreter = %config.interpreter,
            timeout = config.timeout_seconds,
            "harness configured"
        );

        let harness = Harness::new(config);
        let outcome = harness
            .discover_to(&self.cli.script_path, &self.cli.output_path)
            .await;

        self.report(&outcome);
        Ok(outcome.exit_code())
    }

    fn report(&self, outcome: &Outcome) {
        let script = self.cli.script_path.display();
        match outcome {
            Outcome::Captured(manifest) => {
                tracing::info!(
                    "captured {} flag(s) from {} into {}",
                    manifest.len(),
                    script,
                    self.cli.output_path.display()
                );
            }
            Outcome::Unsupported => {
                eprintln!(
                    "{}",
                    ProbeError::Unsupported {
                        path: self.cli.script_path.clone()
                    }
                );
            }
            Outcome::Failed(e) => {
                eprintln!("{}", e);
            }
            Outcome::TimedOut { timeout_seconds } => {
                eprintln!(
                    "{}",
                    ProbeError::TimedOut {
                        path: self.cli.script_path.clone(),
                        timeout: *timeout_seconds,
                    }
                );
            }
        }
    }
}
