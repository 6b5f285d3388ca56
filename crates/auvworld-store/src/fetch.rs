//! Materialize matched worlds as gridded datasets.
//!
//! Remote worlds are cut by the source's [`SubsetService`] once per
//! `(dataset, extent)` and kept in the [`DatasetCache`]; local and
//! metadata-catalog worlds are opened in place.

use crate::cache::DatasetCache;
use crate::error::StoreError;
use crate::grid::GridDataset;
use crate::reader::open_dataset;
use crate::subset::{DirectorySubsetService, HttpSubsetService, SubsetRequest, SubsetService};
use auvworld_kernel::{Extent, MatchedWorld, SourceConfig, SourceKind};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A dataset ready for interpolation.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    pub data_id: String,
    pub source: String,
    pub path: PathBuf,
    pub dataset: GridDataset,
    pub cache_hit: bool,
}

enum Backend {
    Subset(Box<dyn SubsetService>),
    InPlace { fill_value: Option<f64> },
}

pub struct Fetcher {
    cache: DatasetCache,
    backends: BTreeMap<String, Backend>,
}

impl Fetcher {
    pub fn new(cache: DatasetCache) -> Self {
        Self {
            cache,
            backends: BTreeMap::new(),
        }
    }

    /// Register a backend for every configured source.
    ///
    /// A remote source's `subset_url` is either an `http(s)` endpoint or a
    /// mirror directory. Remote sources without one cannot be fetched and
    /// are left unregistered.
    pub fn from_sources(cache: DatasetCache, sources: &[SourceConfig]) -> Result<Self, StoreError> {
        let mut fetcher = Self::new(cache);
        for source in sources {
            match &source.kind {
                SourceKind::RemoteCatalog {
                    subset_url: Some(url),
                    timeout_secs,
                    ..
                } => {
                    if url.starts_with("http://") || url.starts_with("https://") {
                        let service =
                            HttpSubsetService::new(url, Duration::from_secs(*timeout_secs))?;
                        fetcher.register_service(&source.name, service);
                    } else {
                        fetcher.register_service(&source.name, DirectorySubsetService::new(url));
                    }
                }
                SourceKind::RemoteCatalog {
                    subset_url: None, ..
                } => {
                    warn!(source = %source.name, "remote source has no subset_url; datasets cannot be fetched");
                }
                SourceKind::LocalDirectory { fill_value, .. } => {
                    fetcher.register_in_place(&source.name, *fill_value);
                }
                SourceKind::MetadataCatalog { .. } => {
                    fetcher.register_in_place(&source.name, None);
                }
            }
        }
        Ok(fetcher)
    }

    pub fn register_service(&mut self, source: &str, service: impl SubsetService + 'static) {
        self.backends
            .insert(source.to_string(), Backend::Subset(Box::new(service)));
    }

    pub fn register_in_place(&mut self, source: &str, fill_value: Option<f64>) {
        self.backends
            .insert(source.to_string(), Backend::InPlace { fill_value });
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn materialize(
        &self,
        world: &MatchedWorld,
        extent: &Extent,
    ) -> Result<DatasetHandle, StoreError> {
        let backend = self
            .backends
            .get(&world.source)
            .ok_or_else(|| StoreError::UnknownSourceKey(world.source.clone()))?;
        match backend {
            Backend::Subset(service) => self.fetch_remote(service.as_ref(), world, extent),
            Backend::InPlace { fill_value } => open_in_place(world, *fill_value),
        }
    }

    fn fetch_remote(
        &self,
        service: &dyn SubsetService,
        world: &MatchedWorld,
        extent: &Extent,
    ) -> Result<DatasetHandle, StoreError> {
        let variables = world.source_variables();
        let path = self.cache.path_for(&world.data_id, extent);
        if let Some(dataset) = self.cache.load(&path)? {
            if variables
                .iter()
                .all(|name| dataset.variables.contains_key(name))
            {
                info!(dataset = %world.data_id, path = %path.display(), "dataset cache hit");
                return Ok(DatasetHandle {
                    data_id: world.data_id.clone(),
                    source: world.source.clone(),
                    path,
                    dataset,
                    cache_hit: true,
                });
            }
            debug!(dataset = %world.data_id, "cached subset lacks requested variables; refetching");
        }

        let request = SubsetRequest::new(&world.data_id, variables, extent);
        info!(dataset = %world.data_id, source = %world.source, "fetching subset");
        let subset = service.subset(&request)?;
        self.cache.store(&path, &subset)?;
        let dataset = open_dataset(&path)?;
        Ok(DatasetHandle {
            data_id: world.data_id.clone(),
            source: world.source.clone(),
            path,
            dataset,
            cache_hit: false,
        })
    }
}

fn open_in_place(world: &MatchedWorld, fill_value: Option<f64>) -> Result<DatasetHandle, StoreError> {
    let path = world.local_dir.clone().ok_or_else(|| {
        StoreError::Malformed(format!("{} has no local dataset path", world.data_id))
    })?;
    let mut dataset = open_dataset(&path)?;
    if let Some(fill) = fill_value {
        dataset.mask_value(fill);
    }
    debug!(dataset = %world.data_id, path = %path.display(), "opened dataset in place");
    Ok(DatasetHandle {
        data_id: world.data_id.clone(),
        source: world.source.clone(),
        path,
        dataset,
        cache_hit: false,
    })
}
