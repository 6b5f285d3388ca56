//! Engine configuration (TOML).
//!
//! Relative paths in a config file are resolved against the directory the
//! file lives in, so a mission folder can be moved as a unit.

use crate::error::EngineError;
use auvworld_interp::MissingDataPolicy;
use auvworld_kernel::parameter::UPWARD_VELOCITY;
use auvworld_kernel::{Margins, ParameterEntry, ParameterInventory, SourceConfig, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MISSION_ID: &str = "mission-001";
pub const DEFAULT_CACHE_DIR: &str = ".auvworld/cache";
pub const DEFAULT_INTERPOLATOR_CACHE_DIR: &str = ".auvworld/interpolator_cache";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub mission_id: String,
    pub cache_dir: PathBuf,
    pub interpolator_cache_dir: PathBuf,
    pub cache_interpolators: bool,
    /// Canonical variables the mission needs. Empty means every
    /// non-optional parameter plus `upward_velocity`.
    pub variables: Vec<String>,
    /// Parameter table file; the built-in table when absent.
    pub parameters: Option<PathBuf>,
    /// Worker threads for whole-trajectory queries.
    pub threads: usize,
    pub margins: Margins,
    pub missing_data: MissingDataPolicy,
    pub sources: Vec<SourceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mission_id: DEFAULT_MISSION_ID.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            interpolator_cache_dir: PathBuf::from(DEFAULT_INTERPOLATOR_CACHE_DIR),
            cache_interpolators: true,
            variables: Vec::new(),
            parameters: None,
            threads: 1,
            margins: Margins::default(),
            missing_data: MissingDataPolicy::default(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParameterTable {
    #[serde(default)]
    parameters: Vec<ParameterEntry>,
}

impl EngineConfig {
    /// Read, resolve and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path.display(), e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&text, base).map_err(|err| match err {
            EngineError::ParseToml { source, .. } => EngineError::ParseToml {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse config text, resolving relative paths against `base`.
    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self, EngineError> {
        let mut config: Self = toml::from_str(text).map_err(|source| EngineError::ParseToml {
            path: "<inline>".to_string(),
            source,
        })?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.mission_id.trim().is_empty() {
            return Err(EngineError::Config("mission_id must be non-empty".to_string()));
        }
        if self.threads == 0 {
            return Err(EngineError::Config("threads must be at least 1".to_string()));
        }
        if !self.missing_data.surface_threshold_m.is_finite()
            || self.missing_data.surface_threshold_m < 0.0
        {
            return Err(EngineError::Config(format!(
                "missing_data.surface_threshold_m must be a non-negative number, got {}",
                self.missing_data.surface_threshold_m
            )));
        }
        let mut names = BTreeSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(EngineError::Config("source name must be non-empty".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate source name {}",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// The configured parameter table, or the built-in one.
    pub fn inventory(&self) -> Result<ParameterInventory, EngineError> {
        let Some(path) = &self.parameters else {
            return Ok(ParameterInventory::builtin());
        };
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path.display(), e))?;
        let table: ParameterTable =
            toml::from_str(&text).map_err(|source| EngineError::ParseToml {
                path: path.display().to_string(),
                source,
            })?;
        Ok(ParameterInventory::from_entries(table.parameters)?)
    }

    /// Variables to search for, in config order, without duplicates.
    pub fn required_variables(&self, inventory: &ParameterInventory) -> Vec<String> {
        let listed = if self.variables.is_empty() {
            let mut names = inventory.required_names();
            if inventory.get(UPWARD_VELOCITY).is_some() {
                names.push(UPWARD_VELOCITY.to_string());
            }
            names
        } else {
            self.variables.clone()
        };
        let mut seen = BTreeSet::new();
        listed
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.cache_dir = join_relative(base, &self.cache_dir);
        self.interpolator_cache_dir = join_relative(base, &self.interpolator_cache_dir);
        if let Some(parameters) = &self.parameters {
            self.parameters = Some(join_relative(base, parameters));
        }
        for source in &mut self.sources {
            match &mut source.kind {
                SourceKind::RemoteCatalog {
                    describe,
                    subset_url,
                    ..
                } => {
                    *describe = join_location(base, describe);
                    if let Some(url) = subset_url {
                        *url = join_location(base, url);
                    }
                }
                SourceKind::LocalDirectory { root, .. } => *root = join_relative(base, root),
                SourceKind::MetadataCatalog { path } => *path = join_relative(base, path),
            }
        }
    }
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn join_location(base: &Path, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    join_relative(base, Path::new(location))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mission_id = "nws-glider"
cache_dir = "cache"
variables = ["eastward_velocity", "northward_velocity", "eastward_velocity"]

[margins]
spatial_deg = 1.0

[missing_data]
surface_threshold_m = 2.0

[[sources]]
name = "cmems"
kind = "remote_catalog"
priority = 1
describe = "https://example.org/describe.json"
subset_url = "mirror"

[[sources]]
name = "archive"
kind = "local_directory"
priority = 2
root = "/data/models"
fill_value = -32767.0

[[sources]]
name = "intake"
kind = "metadata_catalog"
path = "catalog.json"
"#;

    #[test]
    fn parses_and_resolves_relative_paths() {
        let config = EngineConfig::from_toml_str(SAMPLE, Path::new("/missions/a")).unwrap();
        assert_eq!(config.mission_id, "nws-glider");
        assert_eq!(config.cache_dir, PathBuf::from("/missions/a/cache"));
        assert_eq!(
            config.interpolator_cache_dir,
            PathBuf::from("/missions/a/.auvworld/interpolator_cache")
        );
        assert!(config.cache_interpolators);
        assert_eq!(config.margins.spatial_deg, 1.0);
        assert_eq!(config.margins.depth_m, 100.0);
        assert_eq!(config.missing_data.surface_threshold_m, 2.0);

        match &config.sources[0].kind {
            SourceKind::RemoteCatalog {
                describe,
                subset_url,
                timeout_secs,
            } => {
                assert_eq!(describe, "https://example.org/describe.json");
                assert_eq!(subset_url.as_deref(), Some("/missions/a/mirror"));
                assert_eq!(*timeout_secs, 120);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(
            config.sources[1].kind,
            SourceKind::LocalDirectory {
                root: PathBuf::from("/data/models"),
                fill_value: Some(-32767.0),
            }
        );
        assert_eq!(
            config.sources[2].kind,
            SourceKind::MetadataCatalog {
                path: PathBuf::from("/missions/a/catalog.json"),
            }
        );
    }

    #[test]
    fn required_variables_default_and_dedupe() {
        let inventory = ParameterInventory::builtin();
        let config = EngineConfig::from_toml_str(SAMPLE, Path::new("")).unwrap();
        assert_eq!(
            config.required_variables(&inventory),
            vec!["eastward_velocity", "northward_velocity"]
        );
        assert_eq!(
            EngineConfig::default().required_variables(&inventory),
            vec!["eastward_velocity", "northward_velocity", "upward_velocity"]
        );
    }

    #[test]
    fn rejects_bad_configs() {
        let duplicate = r#"
[[sources]]
name = "a"
kind = "metadata_catalog"
path = "x.json"

[[sources]]
name = "a"
kind = "metadata_catalog"
path = "y.json"
"#;
        assert!(matches!(
            EngineConfig::from_toml_str(duplicate, Path::new("")),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("threads = 0", Path::new("")),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("mission = 1", Path::new("")),
            Err(EngineError::ParseToml { .. })
        ));
    }
}
