//! devstack CLI entry point.

use clap::Parser;
use devstack::cli::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = devstack::telemetry::init_logging(cli.verbose) {
        eprintln!("warning: {}", e);
    }
    if let Err(e) = devstack::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
