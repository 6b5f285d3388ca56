use crate::support::{exit_with, load_engine_or_exit, load_track_or_exit, print_json};
use auvworld_kernel::TrackPoint;
use chrono::{DateTime, Utc};

pub struct Args {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    pub track: Option<String>,
    pub config: String,
    pub json: bool,
}

pub fn run(args: Args) {
    let point = TrackPoint {
        time: args.time,
        lat: args.lat,
        lon: args.lon,
        depth: args.depth,
    };
    let mut engine = load_engine_or_exit(&args.config);
    let track = match &args.track {
        Some(path) => load_track_or_exit(path),
        None => vec![point],
    };
    engine.prepare(&track).unwrap_or_else(|e| exit_with(e));
    let reality = engine.teleport(&point).unwrap_or_else(|e| exit_with(e));

    if args.json {
        print_json(&reality);
    } else {
        println!(
            "auvworld teleport {} lat={} lon={} depth={}",
            reality.time.to_rfc3339(),
            reality.lat,
            reality.lon,
            reality.depth
        );
        for (canonical, value) in &reality.values {
            println!("  {canonical}: {value}");
        }
    }
}
