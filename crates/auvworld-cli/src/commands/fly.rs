use crate::support::{exit_with, load_engine_or_exit, load_track_or_exit, print_json};
use auvworld_engine::write_reality;
use serde_json::json;
use std::fs;
use std::io::{BufWriter, Write};

pub fn run(track: String, output: Option<String>, config: String, json_output: bool) {
    let mut engine = load_engine_or_exit(&config);
    let points = load_track_or_exit(&track);
    engine.prepare(&points).unwrap_or_else(|e| exit_with(e));
    let flight = engine.fly(&points).unwrap_or_else(|e| exit_with(e));

    match &output {
        Some(path) => {
            let file = fs::File::create(path)
                .unwrap_or_else(|e| exit_with(format!("failed to create {path}: {e}")));
            let mut writer = BufWriter::new(file);
            write_reality(&mut writer, &flight)
                .and_then(|()| writer.flush())
                .unwrap_or_else(|e| exit_with(format!("failed to write {path}: {e}")));
        }
        None if !json_output => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_reality(&mut writer, &flight)
                .unwrap_or_else(|e| exit_with(format!("failed to write stdout: {e}")));
        }
        None => {}
    }

    if json_output {
        print_json(&json!({
            "track": track,
            "pointCount": flight.len(),
            "variables": engine.state().interpolators.canonical_names().collect::<Vec<_>>(),
            "output": output,
        }));
    }
}
