use crate::support::{exit_with, load_engine_or_exit, load_track_or_exit, print_json};
use auvworld_interp::BuildAction;

pub fn run(track: String, config: String, json_output: bool) {
    let mut engine = load_engine_or_exit(&config);
    let points = load_track_or_exit(&track);
    let report = engine.prepare(&points).unwrap_or_else(|e| exit_with(e));

    if json_output {
        print_json(&report);
        return;
    }

    println!("auvworld build {track}");
    println!("  Mission: {}", report.mission_id);
    println!("  Worlds: {}", report.worlds.len());
    let hits = report.fetched.iter().filter(|f| f.cache_hit).count();
    println!(
        "  Fetched: {} ({} from cache)",
        report.fetched.len(),
        hits
    );
    for event in &report.events {
        let action = match event.action {
            BuildAction::Built => "built",
            BuildAction::LoadedFromCache => "cached",
            BuildAction::Skipped => "skipped",
            BuildAction::Declined => "declined",
        };
        match &event.detail {
            Some(detail) => println!(
                "    {action:<8} {} <- {} [{} p{}] ({detail})",
                event.canonical, event.data_id, event.source, event.priority
            ),
            None => println!(
                "    {action:<8} {} <- {} [{} p{}]",
                event.canonical, event.data_id, event.source, event.priority
            ),
        }
    }
    for (canonical, backing) in &report.backing {
        println!("  Active: {canonical} = {} (priority {})", backing.source, backing.priority);
    }
    if !report.missing.is_empty() {
        println!("  Missing: {}", report.missing.join(", "));
    }
}
