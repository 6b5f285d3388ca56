//! Flat metadata catalogs describing local files.
//!
//! ```json
//! {"entries": [{"name": "nws-uv", "urlpath": "nws/uv.grid.json",
//!               "variables": ["uo", "vo"], "bbox": [-20, 40, 13, 65],
//!               "time_start": "2018-01-01T00:00:00Z", "time_end": "2020-01-01T00:00:00Z",
//!               "field_type": "P1D-m", "domain": "regional"}]}
//! ```
//!
//! Coverage is taken from the declared metadata; the file is opened in
//! place only when fetched.

use crate::error::{CatalogError, MatchRejection};
use crate::local::{add_matches, covers, resolve_all};
use auvworld_kernel::{
    DomainType, Extent, FieldType, MatchedWorld, MatchedWorlds, ParameterInventory, WorldType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCatalog {
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub urlpath: String,
    pub variables: Vec<String>,
    /// `[lon_min, lat_min, lon_max, lat_max]`
    pub bbox: [f64; 4],
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub domain: Option<DomainType>,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn load_catalog(path: &Path) -> Result<MetadataCatalog, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| CatalogError::parse(path.display(), e))
}

pub fn match_catalog(
    path: &Path,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> Result<MatchedWorlds, CatalogError> {
    let catalog = load_catalog(path)?;
    let base = path.parent().unwrap_or(Path::new("."));
    let mut worlds = MatchedWorlds::new();
    for (index, raw) in catalog.entries.into_iter().enumerate() {
        let entry: CatalogEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(catalog = %path.display(), index, "skipping malformed entry: {err}");
                continue;
            }
        };
        match evaluate(&entry, base, required, extent, inventory, source) {
            Ok(world) => {
                info!(dataset = %world.data_id, "matched catalog entry");
                worlds.insert_or_merge(world);
            }
            Err(MatchRejection::NoAlias(_)) => {}
            Err(rejection) => debug!(entry = %entry.name, "rejected: {rejection}"),
        }
    }
    Ok(worlds)
}

pub fn evaluate(
    entry: &CatalogEntry,
    base: &Path,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> Result<MatchedWorld, MatchRejection> {
    let matches = resolve_all(inventory, required, &entry.variables);
    if matches.is_empty() {
        return Err(MatchRejection::NoAlias(entry.name.clone()));
    }
    let [lon_min, lat_min, lon_max, lat_max] = entry.bbox;
    let domain = entry
        .domain
        .unwrap_or_else(|| DomainType::from_span(lat_max - lat_min, lon_max - lon_min));
    // The declared domain is descriptive; containment follows the bbox.
    if !covers(entry.bbox, extent) {
        return Err(MatchRejection::OutsideBbox(entry.bbox));
    }
    if !extent.is_within_time_ms(
        entry.time_start.timestamp_millis(),
        entry.time_end.timestamp_millis(),
    ) {
        return Err(MatchRejection::OutsideTime);
    }
    let field_type = entry
        .field_type
        .as_deref()
        .map(|tag| FieldType::from_suffix(tag).unwrap_or_else(|| FieldType::infer_from_text(tag)))
        .unwrap_or(FieldType::Unspecified);

    let mut world = MatchedWorld {
        data_id: entry.name.clone(),
        source: source.to_string(),
        world_type: WorldType::MetadataCatalog,
        domain,
        dataset_name: entry
            .description
            .clone()
            .unwrap_or_else(|| entry.name.clone()),
        resolution: None,
        field_type,
        variable_alias: BTreeMap::new(),
        alternative_parameter: BTreeMap::new(),
        local_dir: Some(base.join(&entry.urlpath)),
    };
    add_matches(&mut world, matches);
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn extent() -> Extent {
        Extent::new(
            56.0,
            58.0,
            6.0,
            7.0,
            200.0,
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 1, 7, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn entry(bbox: [f64; 4]) -> CatalogEntry {
        serde_json::from_value(json!({
            "name": "nws-uv",
            "urlpath": "nws/uv.grid.json",
            "variables": ["uo", "vo", "zos"],
            "bbox": bbox,
            "time_start": "2018-01-01T00:00:00Z",
            "time_end": "2020-01-01T00:00:00Z",
            "field_type": "PT1H-i"
        }))
        .expect("entry parses")
    }

    #[test]
    fn entry_resolves_urlpath_against_catalog_dir() {
        let required = vec!["eastward_velocity".to_string(), "northward_velocity".to_string()];
        let world = evaluate(
            &entry([-20.0, 40.0, 13.0, 65.0]),
            Path::new("/catalogs"),
            &required,
            &extent(),
            &ParameterInventory::builtin(),
            "intake",
        )
        .expect("entry matches");
        assert_eq!(world.local_dir.as_deref(), Some(Path::new("/catalogs/nws/uv.grid.json")));
        assert_eq!(world.field_type, FieldType::HourlyInstantaneous);
        assert_eq!(world.domain, DomainType::Regional);
        assert_eq!(world.variable_alias.len(), 2);
        assert_eq!(world.world_type, WorldType::MetadataCatalog);
    }

    #[test]
    fn entry_outside_bbox_is_rejected() {
        let required = vec!["eastward_velocity".to_string()];
        let rejection = evaluate(
            &entry([6.5, 40.0, 13.0, 65.0]),
            Path::new("."),
            &required,
            &extent(),
            &ParameterInventory::builtin(),
            "intake",
        )
        .unwrap_err();
        assert!(matches!(rejection, MatchRejection::OutsideBbox(_)));
    }

    #[test]
    fn declared_global_domain_does_not_skip_longitude_check() {
        let mut narrow = entry([100.0, -90.0, 110.0, 90.0]);
        narrow.domain = Some(DomainType::Global);
        let required = vec!["eastward_velocity".to_string()];
        let rejection = evaluate(
            &narrow,
            Path::new("."),
            &required,
            &extent(),
            &ParameterInventory::builtin(),
            "intake",
        )
        .unwrap_err();
        assert_eq!(rejection, MatchRejection::OutsideBbox([100.0, -90.0, 110.0, 90.0]));
    }

    #[test]
    fn primary_variable_shadows_total_velocity_in_one_entry() {
        let mut both = entry([-20.0, 40.0, 13.0, 65.0]);
        both.variables = vec!["utotal".to_string(), "uo".to_string()];
        let required = vec!["eastward_velocity".to_string()];
        let world = evaluate(
            &both,
            Path::new("."),
            &required,
            &extent(),
            &ParameterInventory::builtin(),
            "intake",
        )
        .expect("entry matches");
        assert_eq!(world.source_variables(), vec!["uo"]);
        assert_eq!(world.alternative_parameter["eastward_velocity"], None);
    }
}
