//! `ccs` binary: loads a ruleset, asserts steps from argv, prints properties.

use clap::Parser;

/// Evaluate a Cascading Configuration Sheet against a sequence of steps.
#[derive(Parser)]
#[command(name = "ccs", version, about)]
struct Cli {
    /// Ruleset file to load, or `-` for stdin.
    #[arg(default_value = "-")]
    source: String,

    /// Steps to assert, in order (`key` or `key.value`).
    steps: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let mut args = vec![cli.source];
    args.extend(cli.steps);
    ccs::shell::main(args);
}
