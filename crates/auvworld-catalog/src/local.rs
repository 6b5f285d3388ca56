//! Local archives: a directory tree of gridded dataset files.
//!
//! Nothing in a local file's name is trusted. Coverage is read from the
//! native coordinate arrays; field type and domain are guessed from
//! attribute text and coordinate span.

use crate::error::{CatalogError, MatchRejection};
use crate::matcher::{VariableMatch, resolve_variable};
use auvworld_kernel::{
    DomainType, Extent, FieldType, GLOBAL_SPAN_TOLERANCE_DEG, MatchedWorld, MatchedWorlds,
    ParameterInventory, WorldType,
};
use auvworld_store::{DatasetFormat, DatasetProbe, probe_dataset};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Attributes searched, in order, for a temporal-resolution hint.
const FIELD_TYPE_ATTRIBUTES: &[&str] = &[
    "time_coverage_resolution",
    "field_type",
    "title",
    "product",
    "summary",
    "comment",
];

const RESOLUTION_ATTRIBUTES: &[&str] = &["resolution", "geospatial_lat_resolution"];

pub fn scan_directory(
    root: &Path,
    fill_value: Option<f64>,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> Result<MatchedWorlds, CatalogError> {
    if !root.is_dir() {
        return Err(CatalogError::io(root.display(), "not a directory"));
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), "skipping unreadable entry: {err}");
                continue;
            }
        };
        if entry.file_type().is_file() && DatasetFormat::detect(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    let mut worlds = MatchedWorlds::new();
    for path in files {
        let data_id = relative_id(root, &path);
        match match_file(&path, &data_id, fill_value, required, extent, inventory, source) {
            Ok(world) => {
                info!(dataset = %data_id, field_type = %world.field_type, "matched local dataset");
                worlds.insert_or_merge(world);
            }
            Err(MatchRejection::NoAlias(_)) => {
                debug!(dataset = %data_id, "no required variables");
            }
            Err(rejection @ (MatchRejection::Unreadable(_) | MatchRejection::NoCoordinates)) => {
                warn!(path = %path.display(), "skipping dataset: {rejection}");
            }
            Err(rejection) => debug!(dataset = %data_id, "rejected: {rejection}"),
        }
    }
    Ok(worlds)
}

fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn match_file(
    path: &Path,
    data_id: &str,
    fill_value: Option<f64>,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> Result<MatchedWorld, MatchRejection> {
    let probe = probe_dataset(path).map_err(|e| MatchRejection::Unreadable(e.to_string()))?;

    let matches = resolve_all(inventory, required, &probe.variables);
    if matches.is_empty() {
        return Err(MatchRejection::NoAlias(data_id.to_string()));
    }

    if probe.depth_len <= 1 {
        return Err(MatchRejection::FlatDepth);
    }
    let (lat_min, lat_max) = valid_range(&probe.latitude, fill_value)
        .ok_or(MatchRejection::NoCoordinates)?;
    let (lon_min, lon_max) = valid_range(&probe.longitude, fill_value)
        .ok_or(MatchRejection::NoCoordinates)?;
    let domain = DomainType::from_span(lat_max - lat_min, lon_max - lon_min);
    let bbox = [lon_min, lat_min, lon_max, lat_max];
    if !covers(bbox, extent) {
        return Err(MatchRejection::OutsideBbox(bbox));
    }
    let (start, end) = probe.time_range.ok_or(MatchRejection::NoTime)?;
    if !extent.is_within_time_ms(start.timestamp_millis(), end.timestamp_millis()) {
        return Err(MatchRejection::OutsideTime);
    }

    let mut world = MatchedWorld {
        data_id: data_id.to_string(),
        source: source.to_string(),
        world_type: WorldType::LocalDirectory,
        domain,
        dataset_name: probe
            .attributes
            .get("title")
            .cloned()
            .unwrap_or_else(|| data_id.to_string()),
        resolution: RESOLUTION_ATTRIBUTES
            .iter()
            .find_map(|key| probe.attributes.get(*key).cloned()),
        field_type: infer_field_type(&probe),
        variable_alias: BTreeMap::new(),
        alternative_parameter: BTreeMap::new(),
        local_dir: Some(path.to_path_buf()),
    };
    add_matches(&mut world, matches);
    Ok(world)
}

/// Resolve each provider variable name against the required set.
pub(crate) fn resolve_all(
    inventory: &ParameterInventory,
    required: &[String],
    names: &[String],
) -> Vec<(String, VariableMatch)> {
    names
        .iter()
        .filter_map(|name| {
            resolve_variable(inventory, required, name).map(|found| (name.clone(), found))
        })
        .collect()
}

pub(crate) fn add_matches(world: &mut MatchedWorld, matches: Vec<(String, VariableMatch)>) {
    for (name, VariableMatch { canonical, alternate }) in matches {
        world.add_variable(name, canonical, alternate);
    }
}

/// Min and max of the finite, non-fill values.
fn valid_range(values: &[f64], fill_value: Option<f64>) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && Some(*v) != fill_value)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Containment of the extent in a native-coordinate bbox.
///
/// A bbox spanning every longitude only constrains latitude. Grids in the
/// 0..360 convention are also checked against the extent shifted into that
/// convention.
pub(crate) fn covers(bbox: [f64; 4], extent: &Extent) -> bool {
    let [lon_min, lat_min, lon_max, lat_max] = bbox;
    if lon_max - lon_min >= 360.0 - GLOBAL_SPAN_TOLERANCE_DEG {
        return lat_min <= extent.lat_min() && lat_max >= extent.lat_max();
    }
    if extent.is_within_bbox(bbox) {
        return true;
    }
    lon_max > 180.0 && extent.is_within_bbox([lon_min - 360.0, lat_min, lon_max - 360.0, lat_max])
}

fn infer_field_type(probe: &DatasetProbe) -> FieldType {
    FIELD_TYPE_ATTRIBUTES
        .iter()
        .filter_map(|key| probe.attributes.get(*key))
        .map(|text| FieldType::infer_from_text(text))
        .find(|field_type| *field_type != FieldType::Unspecified)
        .unwrap_or(FieldType::Unspecified)
}
