use clap::Parser;
use stockledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    stockledger::telemetry::init_tracing();
    run(Cli::parse())
}
