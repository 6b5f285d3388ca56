use auvworld_store::{GridDataset, GridVariable, write_grid_json};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "auvworld-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_auvworld<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_auvworld");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("auvworld command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be JSON: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, d, 0, 0, 0).unwrap()
}

/// Mission folder with a one-dataset archive, a config and a short track.
fn write_mission(root: &Path) -> (PathBuf, PathBuf) {
    let longitude = vec![5.0, 6.0, 7.0, 8.0];
    let latitude = vec![55.0, 57.0, 59.0];
    let depth = vec![0.5, 10.0, 50.0, 300.0];
    let time: Vec<_> = (0..10).map(|d| day(1) + Duration::days(d)).collect();
    let cells = longitude.len() * latitude.len() * depth.len() * time.len();
    let variable = |value: f64| GridVariable {
        units: Some("m s-1".to_string()),
        fill_value: None,
        values: vec![value; cells],
    };
    let grid = GridDataset {
        attributes: BTreeMap::from([("title".to_string(), "NWS hourly".to_string())]),
        longitude,
        latitude,
        depth,
        time,
        variables: BTreeMap::from([
            ("uo".to_string(), variable(0.3)),
            ("vo".to_string(), variable(-0.1)),
            ("wo".to_string(), variable(0.001)),
        ]),
    };
    write_grid_json(root.join("archive/nws.grid.json"), &grid).expect("fixture write");

    let config = root.join("auvworld.toml");
    fs::write(
        &config,
        r#"
mission_id = "smoke"
cache_dir = "cache"
interpolator_cache_dir = "interp"

[margins]
spatial_deg = 0.5
depth_m = 50.0
time_days = 1

[[sources]]
name = "archive"
kind = "local_directory"
priority = 1
root = "archive"
"#,
    )
    .expect("config write");

    let track = root.join("track.jsonl");
    fs::write(
        &track,
        concat!(
            "# smoke track\n",
            "{\"time\":\"2019-01-03T00:00:00Z\",\"lat\":57.1,\"lon\":6.4,\"depth\":12.0}\n",
            "\n",
            "{\"time\":\"2019-01-03T06:00:00Z\",\"lat\":57.2,\"lon\":6.5,\"depth\":40.0}\n",
        ),
    )
    .expect("track write");
    (config, track)
}

#[test]
fn inventory_lists_builtin_parameters() {
    let tmp = TempDirGuard::new("inventory");
    let (config, _) = write_mission(tmp.path());
    let output = run_auvworld([
        OsStr::new("inventory"),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(
        payload["required"],
        serde_json::json!(["eastward_velocity", "northward_velocity", "upward_velocity"])
    );
    let names: Vec<_> = payload["parameters"]
        .as_array()
        .expect("parameters array")
        .iter()
        .filter_map(|entry| entry["canonical"].as_str())
        .collect();
    assert!(names.contains(&"temperature"));
}

#[test]
fn extent_pads_the_track() {
    let tmp = TempDirGuard::new("extent");
    let (config, track) = write_mission(tmp.path());
    let output = run_auvworld([
        OsStr::new("extent"),
        OsStr::new("--track"),
        track.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["pointCount"], 2);
    assert_eq!(payload["extent"]["depthMax"], 90.0);
    assert_eq!(payload["extent"]["timeStart"], "2019-01-02T00:00:00Z");
}

#[test]
fn build_teleport_and_fly() {
    let tmp = TempDirGuard::new("pipeline");
    let (config, track) = write_mission(tmp.path());

    let build = run_auvworld([
        OsStr::new("build"),
        OsStr::new("--track"),
        track.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&build);
    let report = parse_json_stdout(&build);
    assert_eq!(report["missionId"], "smoke");
    assert_eq!(report["backing"]["eastward_velocity"]["source"], "archive");
    assert_eq!(report["missing"], serde_json::json!([]));

    let teleport = run_auvworld([
        OsStr::new("teleport"),
        OsStr::new("--time"),
        OsStr::new("2019-01-03T00:00:00Z"),
        OsStr::new("--lat"),
        OsStr::new("57.1"),
        OsStr::new("--lon"),
        OsStr::new("6.4"),
        OsStr::new("--depth"),
        OsStr::new("12"),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&teleport);
    let reality = parse_json_stdout(&teleport);
    let u = reality["values"]["eastward_velocity"].as_f64().expect("u");
    let v = reality["values"]["northward_velocity"].as_f64().expect("v");
    assert!((u - 0.3).abs() < 1e-9);
    assert!((v + 0.1).abs() < 1e-9);

    let out = tmp.path().join("reality.jsonl");
    let fly = run_auvworld([
        OsStr::new("fly"),
        OsStr::new("--track"),
        track.as_os_str(),
        OsStr::new("--output"),
        out.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
    ]);
    assert_success(&fly);
    let lines: Vec<Value> = fs::read_to_string(&out)
        .expect("reality written")
        .lines()
        .map(|line| serde_json::from_str(line).expect("reality line is JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["depth"], 40.0);
    assert!(lines[1]["values"]["upward_velocity"].as_f64().is_some());
}

#[test]
fn errors_exit_nonzero_with_message() {
    let tmp = TempDirGuard::new("errors");
    let missing = tmp.path().join("missing.toml");
    let output = run_auvworld([
        OsStr::new("inventory"),
        OsStr::new("--config"),
        missing.as_os_str(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: failed to read"));

    let (config, _) = write_mission(tmp.path());
    let bad_track = tmp.path().join("bad.jsonl");
    fs::write(&bad_track, "{\"lat\": 57.0}\n").expect("track write");
    let output = run_auvworld([
        OsStr::new("extent"),
        OsStr::new("--track"),
        bad_track.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid track point"));
}
