use auvworld_engine::{Engine, EngineConfig, read_track_from_path};
use auvworld_kernel::TrackPoint;
use serde::Serialize;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn exit_with(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn load_config_or_exit(config: &str) -> EngineConfig {
    EngineConfig::load(config).unwrap_or_else(|e| exit_with(e))
}

pub fn load_engine_or_exit(config: &str) -> Engine {
    Engine::new(load_config_or_exit(config)).unwrap_or_else(|e| exit_with(e))
}

pub fn load_track_or_exit(track: &str) -> Vec<TrackPoint> {
    let points = read_track_from_path(track).unwrap_or_else(|e| exit_with(e));
    if points.is_empty() {
        exit_with(format!("trajectory {track} has no points"));
    }
    points
}

pub fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format!("json serialization failed: {e}")),
    }
}
