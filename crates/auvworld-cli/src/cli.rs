use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "auvworld.toml";

#[derive(Parser)]
#[command(
    name = "auvworld",
    about = "auvworld: resolve ocean-model worlds for AUV missions and query them along a track",
    version
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the padded extent of a trajectory
    Extent {
        /// Trajectory JSONL, one {time, lat, lon, depth} per line
        #[arg(long)]
        track: String,

        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the datasets that cover a trajectory
    Search {
        /// Trajectory JSONL
        #[arg(long)]
        track: String,

        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search, fetch and build interpolators for a trajectory
    Build {
        /// Trajectory JSONL
        #[arg(long)]
        track: String,

        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ocean state at a single point
    Teleport {
        /// UTC time, RFC 3339
        #[arg(long)]
        time: DateTime<Utc>,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Metres below the surface
        #[arg(long)]
        depth: f64,

        /// Trajectory JSONL whose extent to build for (defaults to the point)
        #[arg(long)]
        track: Option<String>,

        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ocean state at every trajectory point, as JSONL
    Fly {
        /// Trajectory JSONL
        #[arg(long)]
        track: String,

        /// Write JSONL here instead of stdout
        #[arg(long)]
        output: Option<String>,

        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Print a JSON summary instead of the points
        #[arg(long)]
        json: bool,
    },

    /// Print the parameter table
    Inventory {
        /// Engine config (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
