use flagprobe::{
    cli::{Cli, CliHandler},
    error::ProbeError,
    logging,
};
use std::process;

#[tokio::main]
async fn main() {
    logging::init();

    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let handler = CliHandler::new(cli);

    let exit_code = match handler.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            match e {
                ProbeError::InvalidArguments(_) | ProbeError::ConfigError(_) => 2,
                ProbeError::TimedOut { .. } => 4,
                ProbeError::Unsupported { .. } => 3,
                _ => 1,
            }
        }
    };

    process::exit(exit_code);
}
