//! # auvworld store
//!
//! Gridded ocean-model data on disk and over the wire.
//!
//! - [`GridDataset`]: rectilinear `(time, depth, lat, lon)` grid in memory
//! - [`reader`]: `.grid.json` I/O, plus `.nc` behind the `netcdf` feature
//! - [`SubsetService`]: cut a box out of a provider's dataset
//! - [`DatasetCache`] / [`Fetcher`]: fetch each `(dataset, extent)` once

pub mod cache;
pub mod error;
pub mod fetch;
pub mod grid;
#[cfg(feature = "netcdf")]
mod netcdf_reader;
pub mod reader;
pub mod subset;

pub use cache::{DatasetCache, cache_key};
pub use error::StoreError;
pub use fetch::{DatasetHandle, Fetcher};
pub use grid::{DatasetProbe, GridDataset, GridVariable};
pub use reader::{DatasetFormat, open_dataset, probe_dataset, read_grid_json, write_grid_json};
pub use subset::{DirectorySubsetService, HttpSubsetService, SubsetRequest, SubsetService};
