//! Download-once dataset cache keyed by dataset id and extent.

use crate::error::StoreError;
use crate::grid::GridDataset;
use crate::reader::{GRID_JSON_SUFFIX, read_grid_json, write_grid_json};
use auvworld_kernel::Extent;
use std::path::{Path, PathBuf};

const TIME_KEY_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Deterministic, filesystem-safe key for one `(dataset, extent)` subset.
///
/// Degrees are written with four decimals, depth with one, times to the
/// second, so equal requests always map to the same file.
pub fn cache_key(dataset_id: &str, extent: &Extent) -> String {
    let raw = format!(
        "{}_lon{:.4}_{:.4}_lat{:.4}_{:.4}_dep0_{:.1}_t{}_{}",
        dataset_id,
        extent.lon_min(),
        extent.lon_max(),
        extent.lat_min(),
        extent.lat_max(),
        extent.depth_max(),
        extent.time_start().format(TIME_KEY_FORMAT),
        extent.time_end().format(TIME_KEY_FORMAT),
    );
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DatasetCache {
    dir: PathBuf,
}

impl DatasetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, dataset_id: &str, extent: &Extent) -> PathBuf {
        self.dir
            .join(format!("{}{GRID_JSON_SUFFIX}", cache_key(dataset_id, extent)))
    }

    /// `Ok(None)` when nothing is cached at `path` yet.
    pub fn load(&self, path: &Path) -> Result<Option<GridDataset>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        read_grid_json(path).map(Some)
    }

    pub fn store(&self, path: &Path, grid: &GridDataset) -> Result<(), StoreError> {
        write_grid_json(path, grid)
    }
}
