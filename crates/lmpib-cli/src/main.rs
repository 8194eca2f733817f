mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::FileConfig;
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("🚀 lmpib CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let file_config = FileConfig::load(cli.config.as_deref())?;

    let command_result = match &cli.command {
        Commands::Compile(args) => {
            info!("Dispatching to 'compile' command.");
            commands::compile::run(file_config.merge_compile(args), cli.quiet)
        }
        Commands::Render(args) => {
            info!("Dispatching to 'render' command.");
            file_config
                .merge_render(args)
                .and_then(commands::render::run)
        }
        Commands::Classes => {
            info!("Dispatching to 'classes' command.");
            commands::classes::run()
        }
    };

    match &command_result {
        Ok(()) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}
