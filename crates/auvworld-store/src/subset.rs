//! Source-specific subset/download operations.
//!
//! A [`SubsetService`] turns a dataset id plus a box into a gridded subset.
//! Two transports ship here: an HTTP service that posts the request as JSON
//! and a directory mirror that cuts subsets from full grids on disk.

use crate::error::StoreError;
use crate::grid::GridDataset;
use crate::reader::read_grid_json;
use auvworld_kernel::Extent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetRequest {
    pub dataset_id: String,
    pub variables: Vec<String>,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    pub depth_min: f64,
    pub depth_max: f64,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
}

impl SubsetRequest {
    pub fn new(dataset_id: impl Into<String>, variables: Vec<String>, extent: &Extent) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            variables,
            lon_min: extent.lon_min(),
            lon_max: extent.lon_max(),
            lat_min: extent.lat_min(),
            lat_max: extent.lat_max(),
            depth_min: 0.0,
            depth_max: extent.depth_max(),
            time_start: extent.time_start(),
            time_end: extent.time_end(),
        }
    }
}

pub trait SubsetService: Send + Sync {
    fn subset(&self, request: &SubsetRequest) -> Result<GridDataset, StoreError>;
}

/// Posts a [`SubsetRequest`] as JSON and expects a grid back.
#[derive(Debug, Clone)]
pub struct HttpSubsetService {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSubsetService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::io(&url, e))?;
        Ok(Self { url, client })
    }
}

impl SubsetService for HttpSubsetService {
    fn subset(&self, request: &SubsetRequest) -> Result<GridDataset, StoreError> {
        debug!(url = %self.url, dataset = %request.dataset_id, "requesting remote subset");
        let fetch_err = |message: String| StoreError::Fetch {
            dataset_id: request.dataset_id.clone(),
            message,
        };
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_err(e.to_string()))?;
        let mut grid: GridDataset = response.json().map_err(|e| fetch_err(e.to_string()))?;
        grid.mask_fill_values();
        grid.validate()?;
        Ok(grid)
    }
}

/// Offline mirror: `{root}/{dataset_id}.grid.json` holds each full dataset.
#[derive(Debug, Clone)]
pub struct DirectorySubsetService {
    root: PathBuf,
}

impl DirectorySubsetService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SubsetService for DirectorySubsetService {
    fn subset(&self, request: &SubsetRequest) -> Result<GridDataset, StoreError> {
        let path = self.root.join(format!("{}.grid.json", request.dataset_id));
        if !path.exists() {
            return Err(StoreError::Fetch {
                dataset_id: request.dataset_id.clone(),
                message: format!("mirror file {} not found", path.display()),
            });
        }
        debug!(path = %path.display(), "cutting subset from mirror");
        read_grid_json(&path)?.subset(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::sample_grid;
    use crate::reader::write_grid_json;
    use chrono::TimeZone;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn request_copies_extent_bounds() {
        let extent = Extent::new(
            56.0,
            58.0,
            6.0,
            7.0,
            200.0,
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 1, 7, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let request = SubsetRequest::new("ds", vec!["uo".to_string()], &extent);
        assert_eq!(request.depth_min, 0.0);
        assert_eq!(request.depth_max, 200.0);
        assert_eq!(request.lon_max, 7.0);
        assert_eq!(request.time_end, extent.time_end());
    }

    #[test]
    fn directory_mirror_cuts_subsets() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!(
            "auvworld-mirror-{}-{unique}",
            std::process::id()
        ));
        let grid = sample_grid();
        write_grid_json(root.join("ds.grid.json"), &grid).expect("mirror write");

        let service = DirectorySubsetService::new(&root);
        let request = SubsetRequest {
            dataset_id: "ds".to_string(),
            variables: vec!["uo".to_string()],
            lon_min: 6.0,
            lon_max: 7.0,
            lat_min: 56.0,
            lat_max: 58.0,
            depth_min: 0.0,
            depth_max: 5.0,
            time_start: grid.time[0],
            time_end: grid.time[1],
        };
        let cut = service.subset(&request).expect("mirror subset");
        assert_eq!(cut.longitude, vec![5.0, 6.0, 7.0, 8.0]);

        let missing = SubsetRequest {
            dataset_id: "nope".to_string(),
            ..request
        };
        assert!(matches!(
            service.subset(&missing),
            Err(StoreError::Fetch { .. })
        ));
        let _ = std::fs::remove_dir_all(root);
    }
}
