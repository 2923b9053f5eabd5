//! cmdflow CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod grammar;

#[derive(Parser)]
#[command(name = "cmdflow")]
#[command(about = "Compile command scripts with structured control flow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,
}

/// Use `RUST_LOG` to override, e.g. `RUST_LOG=cmdflow_compiler=trace`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cmdflow=info,cmdflow_compiler=error"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("cmdflow - structured control flow for command scripts");
            println!("Run 'cmdflow --help' for usage information.");
        }
    }
}
