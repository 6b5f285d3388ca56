//! Dataset file I/O.
//!
//! `.grid.json` is the native interchange format: one JSON document per
//! grid, written atomically. `.nc` files are read through the `netcdf`
//! feature when it is enabled.

use crate::error::StoreError;
use crate::grid::{DatasetProbe, GridDataset};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const GRID_JSON_SUFFIX: &str = ".grid.json";
pub const NETCDF_SUFFIX: &str = ".nc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    GridJson,
    NetCdf,
}

impl DatasetFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(GRID_JSON_SUFFIX) {
            Some(Self::GridJson)
        } else if name.ends_with(NETCDF_SUFFIX) {
            Some(Self::NetCdf)
        } else {
            None
        }
    }
}

/// Open any supported dataset file, masking fill values and validating axes.
pub fn open_dataset(path: impl AsRef<Path>) -> Result<GridDataset, StoreError> {
    let path = path.as_ref();
    match DatasetFormat::detect(path) {
        Some(DatasetFormat::GridJson) => read_grid_json(path),
        Some(DatasetFormat::NetCdf) => read_netcdf(path),
        None => Err(StoreError::Unsupported(path.display().to_string())),
    }
}

/// Read only what a catalog scan needs.
pub fn probe_dataset(path: impl AsRef<Path>) -> Result<DatasetProbe, StoreError> {
    let path = path.as_ref();
    match DatasetFormat::detect(path) {
        Some(DatasetFormat::GridJson) => Ok(read_grid_json(path)?.probe()),
        Some(DatasetFormat::NetCdf) => probe_netcdf(path),
        None => Err(StoreError::Unsupported(path.display().to_string())),
    }
}

pub fn read_grid_json(path: impl AsRef<Path>) -> Result<GridDataset, StoreError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| StoreError::io(path.display(), e))?;
    let mut grid: GridDataset = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| StoreError::parse(path.display(), e))?;
    grid.mask_fill_values();
    grid.validate()?;
    Ok(grid)
}

/// Write a grid via temp file + rename so readers never see a partial file.
pub fn write_grid_json(path: impl AsRef<Path>, grid: &GridDataset) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent.display(), e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path).map_err(|e| StoreError::io(tmp_path.display(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, grid)
            .map_err(|e| StoreError::parse(tmp_path.display(), e))?;
        writer
            .flush()
            .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        file.sync_all()
            .map_err(|e| StoreError::io(tmp_path.display(), e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(
            format!("{} -> {}", tmp_path.display(), path.display()),
            e,
        )
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

#[cfg(feature = "netcdf")]
fn read_netcdf(path: &Path) -> Result<GridDataset, StoreError> {
    crate::netcdf_reader::read(path)
}

#[cfg(feature = "netcdf")]
fn probe_netcdf(path: &Path) -> Result<DatasetProbe, StoreError> {
    crate::netcdf_reader::probe(path)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf(path: &Path) -> Result<GridDataset, StoreError> {
    Err(StoreError::Unsupported(format!(
        "{}: built without the `netcdf` feature",
        path.display()
    )))
}

#[cfg(not(feature = "netcdf"))]
fn probe_netcdf(path: &Path) -> Result<DatasetProbe, StoreError> {
    read_netcdf(path).map(|grid| grid.probe())
}
