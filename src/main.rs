use std::process::ExitCode;

use clap::Parser;

use xo_server::cli::{self, XoServerArgs};
use xo_server::infrastructure::container::ContainerError;
use xo_server::logging::{init_logging, LoggingConfig};

fn main() -> ExitCode {
    let args = XoServerArgs::parse();

    if let Err(e) = init_logging(LoggingConfig::from_verbosity(args.verbose)) {
        eprintln!("xo-server: {:#}", e);
    }

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let fatal = e
                .downcast_ref::<ContainerError>()
                .map_or(true, ContainerError::is_fatal);
            let kind = if fatal { "fatal" } else { "error" };
            eprintln!("xo-server: {}: {:#}", kind, e);
            ExitCode::FAILURE
        }
    }
}
