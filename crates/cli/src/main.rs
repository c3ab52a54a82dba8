use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

use commands::{list::ListArgs, scan::ScanArgs};

#[derive(Parser)]
#[command(name = "kumori")]
#[command(about = "Cloud compliance scanner: checks collected account data against a plugin catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plugin catalog against a collected snapshot
    Scan(ScanArgs),

    /// List the plugins available for a provider
    List(ListArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            let exit_code = runtime.block_on(commands::scan::execute(args))?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
        Commands::List(args) => commands::list::execute(args),
    }
}
