// Ledger core - CLI

use clap::Parser;
use ledger_core::{Cli, CliHandler};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let handler = match CliHandler::from_cli(&cli) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error initializing: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handler.handle(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
