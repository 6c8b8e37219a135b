//! ## hostplane
//! Operator interface to the configuration resolution engine: resolve the
//! effective agent configuration once, watch it change, or describe the
//! parameter table.

use clap::Parser;

mod commands;
mod output;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve(args) => commands::resolve(args, cli.log_level.as_deref()).await,
        Commands::Watch(args) => commands::watch(args, cli.log_level.as_deref()).await,
        Commands::Describe(args) => commands::describe(args),
    }
}
