//! Trajectory input and reality output, one JSON object per line.

use crate::error::EngineError;
use auvworld_interp::RealityPoint;
use auvworld_kernel::TrackPoint;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read track points, skipping blank lines and `#` comments.
///
/// `origin` names the input in error messages.
pub fn read_track(reader: impl BufRead, origin: &str) -> Result<Vec<TrackPoint>, EngineError> {
    let mut points = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineError::io(origin, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let point: TrackPoint =
            serde_json::from_str(trimmed).map_err(|source| EngineError::Trajectory {
                path: origin.to_string(),
                line: line_no + 1,
                source,
            })?;
        points.push(point);
    }
    Ok(points)
}

pub fn read_track_from_path(path: impl AsRef<Path>) -> Result<Vec<TrackPoint>, EngineError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| EngineError::io(path.display(), e))?;
    read_track(BufReader::new(file), &path.display().to_string())
}

pub fn write_reality(writer: &mut impl Write, points: &[RealityPoint]) -> std::io::Result<()> {
    for point in points {
        serde_json::to_writer(&mut *writer, point)?;
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    #[test]
    fn skips_blank_lines_and_comments() {
        let input = "# glider 42\n\n{\"time\":\"2019-01-03T00:00:00Z\",\"lat\":57.1,\"lon\":6.4,\"depth\":12.0}\n   \n{\"time\":\"2019-01-03T01:00:00Z\",\"lat\":57.2,\"lon\":6.5,\"depth\":30.0}\n";
        let points = read_track(input.as_bytes(), "track.jsonl").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(
            points[0].time,
            Utc.with_ymd_and_hms(2019, 1, 3, 0, 0, 0).unwrap()
        );
        assert_eq!(points[1].depth, 30.0);
    }

    #[test]
    fn reports_line_of_bad_point() {
        let input = "{\"time\":\"2019-01-03T00:00:00Z\",\"lat\":57.1,\"lon\":6.4,\"depth\":12.0}\n\n{\"lat\":1}\n";
        let err = read_track(input.as_bytes(), "track.jsonl").unwrap_err();
        assert!(matches!(err, EngineError::Trajectory { line: 3, .. }));
        assert!(err.to_string().starts_with("track.jsonl:3:"));
    }

    #[test]
    fn reality_lines_are_json_objects() {
        let point = RealityPoint {
            time: Utc.with_ymd_and_hms(2019, 1, 3, 0, 0, 0).unwrap(),
            lat: 57.1,
            lon: 6.4,
            depth: 12.0,
            values: BTreeMap::from([("eastward_velocity".to_string(), 0.25)]),
        };
        let mut out = Vec::new();
        write_reality(&mut out, &[point.clone(), point]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["values"]["eastward_velocity"], 0.25);
    }
}
