use crate::support::{exit_with, load_config_or_exit, load_track_or_exit, print_json};
use auvworld_kernel::Extent;
use serde_json::json;

pub fn run(track: String, config: String, json_output: bool) {
    let config = load_config_or_exit(&config);
    let points = load_track_or_exit(&track);
    let extent = Extent::from_track(&points, &config.margins).unwrap_or_else(|e| exit_with(e));

    if json_output {
        print_json(&json!({
            "track": track,
            "pointCount": points.len(),
            "margins": config.margins,
            "extent": extent,
        }));
    } else {
        println!("auvworld extent {track}");
        println!("  Points: {}", points.len());
        println!(
            "  Latitude: {:.4} .. {:.4}",
            extent.lat_min(),
            extent.lat_max()
        );
        println!(
            "  Longitude: {:.4} .. {:.4}",
            extent.lon_min(),
            extent.lon_max()
        );
        println!("  Depth: 0 .. {:.1} m", extent.depth_max());
        println!(
            "  Time: {} .. {}",
            extent.time_start().to_rfc3339(),
            extent.time_end().to_rfc3339()
        );
    }
}
