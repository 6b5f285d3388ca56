//! auvworld CLI: the `auvworld` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_logging(cli.verbose);

    match cli.command {
        Commands::Extent {
            track,
            config,
            json,
        } => commands::extent::run(track, config, json),

        Commands::Search {
            track,
            config,
            json,
        } => commands::search::run(track, config, json),

        Commands::Build {
            track,
            config,
            json,
        } => commands::build::run(track, config, json),

        Commands::Teleport {
            time,
            lat,
            lon,
            depth,
            track,
            config,
            json,
        } => commands::teleport::run(commands::teleport::Args {
            time,
            lat,
            lon,
            depth,
            track,
            config,
            json,
        }),

        Commands::Fly {
            track,
            output,
            config,
            json,
        } => commands::fly::run(track, output, config, json),

        Commands::Inventory { config, json } => commands::inventory::run(config, json),
    }
}
