use crate::support::{exit_with, load_engine_or_exit, load_track_or_exit, print_json};
use serde_json::json;

pub fn run(track: String, config: String, json_output: bool) {
    let engine = load_engine_or_exit(&config);
    let points = load_track_or_exit(&track);
    let extent = engine.extent_for(&points).unwrap_or_else(|e| exit_with(e));
    let worlds = engine.search(&extent).unwrap_or_else(|e| exit_with(e));
    let uncovered = worlds.missing(engine.variables().iter().map(String::as_str));

    if json_output {
        print_json(&json!({
            "extent": extent,
            "variables": engine.variables(),
            "worldCount": worlds.len(),
            "worlds": worlds.iter().collect::<Vec<_>>(),
            "uncovered": uncovered,
        }));
    } else {
        println!("auvworld search {track}");
        println!("  Variables: {}", engine.variables().join(", "));
        println!("  Matched worlds: {}", worlds.len());
        for world in worlds.iter() {
            let aliases: Vec<String> = world
                .variable_alias
                .iter()
                .map(|(source_name, canonical)| format!("{source_name}->{canonical}"))
                .collect();
            println!(
                "    - {} [{}] {} {:?}: {}",
                world.data_id,
                world.source,
                world.field_type,
                world.domain,
                aliases.join(", ")
            );
        }
        if !uncovered.is_empty() {
            println!("  Uncovered: {}", uncovered.join(", "));
        }
    }
}
