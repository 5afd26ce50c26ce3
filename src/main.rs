mod artifact;
mod cli;
mod logging;
mod model;
mod prepublish;
mod publish;
mod remote;
mod settings;
mod storage;

use std::process;

use clap::Parser;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
