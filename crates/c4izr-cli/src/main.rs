//! c4izr CLI - Standardize draw.io diagrams into the C4 model

mod cli;
mod output;
mod prompt;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    let mut app = cli::C4izrApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
