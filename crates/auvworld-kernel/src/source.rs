//! Data-provider descriptions and their priorities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// One data provider and the weight it carries in conflicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Higher wins when two sources offer the same canonical variable.
    #[serde(default)]
    pub priority: i64,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Remote describe/subset service.
    RemoteCatalog {
        /// URL or local path of the catalog describe document.
        describe: String,
        #[serde(default)]
        subset_url: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Directory tree of gridded dataset files.
    LocalDirectory {
        root: PathBuf,
        #[serde(default)]
        fill_value: Option<f64>,
    },
    /// Flat metadata catalog pointing at local files.
    MetadataCatalog { path: PathBuf },
}

fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl SourceConfig {
    pub fn world_type(&self) -> WorldType {
        match self.kind {
            SourceKind::RemoteCatalog { .. } => WorldType::RemoteCatalog,
            SourceKind::LocalDirectory { .. } => WorldType::LocalDirectory,
            SourceKind::MetadataCatalog { .. } => WorldType::MetadataCatalog,
        }
    }
}

/// Where a matched world came from; decides how it is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    RemoteCatalog,
    LocalDirectory,
    MetadataCatalog,
}

/// Source name to priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPriorities(BTreeMap<String, i64>);

impl CatalogPriorities {
    pub fn from_sources(sources: &[SourceConfig]) -> Self {
        Self(
            sources
                .iter()
                .map(|source| (source.name.clone(), source.priority))
                .collect(),
        )
    }

    pub fn get(&self, source: &str) -> Option<i64> {
        self.0.get(source).copied()
    }

    pub fn insert(&mut self, source: impl Into<String>, priority: i64) {
        self.0.insert(source.into(), priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_source_kinds() {
        let raw = serde_json::json!([
            {"name": "cmems", "kind": "remote_catalog", "priority": 1,
             "describe": "describe.json"},
            {"name": "archive", "kind": "local_directory", "priority": 2,
             "root": "/data", "fill_value": -32767.0},
            {"name": "intake", "kind": "metadata_catalog", "path": "catalog.json"}
        ]);
        let sources: Vec<SourceConfig> = serde_json::from_value(raw).expect("sources decode");
        assert_eq!(sources[0].world_type(), WorldType::RemoteCatalog);
        assert!(matches!(
            sources[0].kind,
            SourceKind::RemoteCatalog {
                timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
                ..
            }
        ));
        assert_eq!(sources[1].world_type(), WorldType::LocalDirectory);
        assert_eq!(sources[2].priority, 0);

        let priorities = CatalogPriorities::from_sources(&sources);
        assert_eq!(priorities.get("archive"), Some(2));
        assert_eq!(priorities.get("missing"), None);
    }
}
