mod cli;
mod commands;
mod config;
mod error;
mod logging;

use std::sync::Arc;

use clap::Parser;
use log::debug;

use nodapt_core::{HttpTransport, Manager, VersionStore};
use nodapt_platform::Platform;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::AppError;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => {
            let _ = error.print();
            std::process::exit(AppError::EXIT_CODE);
        }
        Err(error) => error.exit(),
    };

    let config = Config::from_env();
    let debug_enabled = config.as_ref().is_ok_and(|config| config.debug);
    logging::init_logging(debug_enabled);

    let code = match config.map_err(AppError::from).and_then(|config| run(cli, config)) {
        Ok(code) => code,
        Err(error) => {
            if debug_enabled {
                eprintln!("{}", error.detailed());
            } else {
                eprintln!("{error}");
                eprintln!("Print debug information when set DEBUG=1");
            }
            AppError::EXIT_CODE
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli, config: Config) -> Result<i32, AppError> {
    debug!("Configuration: {config:?}");

    let platform = Platform::current()?;
    let transport = HttpTransport::new().map_err(AppError::HttpClient)?;
    let manager = Manager::new(
        VersionStore::new(config.cache_root, platform),
        Arc::new(transport),
        config.mirror,
    );
    let cwd = std::env::current_dir().map_err(AppError::WorkingDir)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    let mut stdout = std::io::stdout();
    runtime.block_on(commands::execute(cli.command, &manager, &cwd, &mut stdout))
}
