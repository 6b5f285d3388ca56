//! The mission pipeline: extent, search, fetch, build, query.

use crate::config::EngineConfig;
use crate::error::EngineError;
use auvworld_catalog::CatalogMatcher;
use auvworld_interp::{
    BuildEvent, InterpolatorBuilder, InterpolatorCache, InterpolatorSet, RealityPoint,
    RealityQuery,
};
use auvworld_kernel::{
    Backing, CatalogPriorities, Extent, InterpolatorPriorities, MatchedWorlds,
    ParameterInventory, TrackPoint,
};
use auvworld_store::{DatasetCache, DatasetHandle, Fetcher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Which source backs each variable, and the interpolants built from them.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub priorities: InterpolatorPriorities,
    pub interpolators: InterpolatorSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    pub data_id: String,
    pub source: String,
    pub path: PathBuf,
    pub cache_hit: bool,
}

impl From<&DatasetHandle> for FetchSummary {
    fn from(handle: &DatasetHandle) -> Self {
        Self {
            data_id: handle.data_id.clone(),
            source: handle.source.clone(),
            path: handle.path.clone(),
            cache_hit: handle.cache_hit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub mission_id: String,
    pub extent: Extent,
    pub worlds: Vec<String>,
    pub fetched: Vec<FetchSummary>,
    pub events: Vec<BuildEvent>,
    pub backing: BTreeMap<String, Backing>,
    /// Required variables nothing could back.
    pub missing: Vec<String>,
}

pub struct Engine {
    config: EngineConfig,
    inventory: ParameterInventory,
    variables: Vec<String>,
    catalog_priorities: CatalogPriorities,
    state: EngineState,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let inventory = config.inventory()?;
        let variables = config.required_variables(&inventory);
        if variables.is_empty() {
            return Err(EngineError::Config("no variables to resolve".to_string()));
        }
        for name in &variables {
            inventory.require(name)?;
        }
        let catalog_priorities = CatalogPriorities::from_sources(&config.sources);
        Ok(Self {
            config,
            inventory,
            variables,
            catalog_priorities,
            state: EngineState::default(),
        })
    }

    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::new(EngineConfig::load(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn inventory(&self) -> &ParameterInventory {
        &self.inventory
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn extent_for(&self, track: &[TrackPoint]) -> Result<Extent, EngineError> {
        Ok(Extent::from_track(track, &self.config.margins)?)
    }

    pub fn search(&self, extent: &Extent) -> Result<MatchedWorlds, EngineError> {
        let worlds = CatalogMatcher::new(&self.inventory).search(
            &self.variables,
            extent,
            &self.config.sources,
        )?;
        let uncovered = worlds.missing(self.variables.iter().map(String::as_str));
        if !uncovered.is_empty() {
            warn!(variables = ?uncovered, "no matched world offers these variables");
        }
        Ok(worlds)
    }

    /// Materialize every matched world.
    ///
    /// A failure aborts unless the world only offers optional variables, in
    /// which case it is logged and dropped.
    pub fn fetch(
        &self,
        worlds: &MatchedWorlds,
        extent: &Extent,
    ) -> Result<Vec<DatasetHandle>, EngineError> {
        let fetcher = Fetcher::from_sources(
            DatasetCache::new(&self.config.cache_dir),
            &self.config.sources,
        )?;
        let mut handles = Vec::with_capacity(worlds.len());
        for world in worlds.iter() {
            match fetcher.materialize(world, extent) {
                Ok(handle) => handles.push(handle),
                Err(err)
                    if world
                        .canonical_variables()
                        .all(|name| self.inventory.is_optional(name)) =>
                {
                    warn!(dataset = %world.data_id, "dropping dataset with only optional variables: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(handles)
    }

    /// Replace the engine state with interpolants built from `handles`.
    pub fn build_from(
        &mut self,
        extent: &Extent,
        worlds: &MatchedWorlds,
        handles: &[DatasetHandle],
    ) -> Result<BuildReport, EngineError> {
        let cache = self.config.cache_interpolators.then(|| {
            InterpolatorCache::new(&self.config.interpolator_cache_dir, &self.config.mission_id)
        });
        let mut builder = InterpolatorBuilder::new(&self.catalog_priorities, &self.inventory);
        if let Some(cache) = &cache {
            builder = builder.with_cache(cache);
        }

        let mut state = EngineState::default();
        let events = builder.build(
            worlds,
            handles,
            &mut state.priorities,
            &mut state.interpolators,
        )?;
        self.state = state;

        let missing: Vec<String> = self
            .variables
            .iter()
            .filter(|name| {
                self.state.interpolators.get(name).is_none() && !self.inventory.is_optional(name)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(variables = ?missing, "required variables have no interpolator");
        }
        info!(
            mission = %self.config.mission_id,
            interpolators = self.state.interpolators.len(),
            "interpolator set ready"
        );

        Ok(BuildReport {
            mission_id: self.config.mission_id.clone(),
            extent: *extent,
            worlds: worlds.iter().map(|world| world.data_id.clone()).collect(),
            fetched: handles.iter().map(FetchSummary::from).collect(),
            events,
            backing: self
                .state
                .priorities
                .iter()
                .map(|(name, backing)| (name.to_string(), backing.clone()))
                .collect(),
            missing,
        })
    }

    /// Search, fetch and build for `extent`.
    pub fn build(&mut self, extent: &Extent) -> Result<BuildReport, EngineError> {
        let worlds = self.search(extent)?;
        let handles = self.fetch(&worlds, extent)?;
        self.build_from(extent, &worlds, &handles)
    }

    /// Build for the padded extent of a trajectory.
    pub fn prepare(&mut self, track: &[TrackPoint]) -> Result<BuildReport, EngineError> {
        let extent = self.extent_for(track)?;
        self.build(&extent)
    }

    pub fn query(&self) -> RealityQuery<'_> {
        RealityQuery::new(
            &self.state.interpolators,
            &self.inventory,
            self.variables.clone(),
        )
        .with_policy(self.config.missing_data)
    }

    pub fn teleport(&self, point: &TrackPoint) -> Result<RealityPoint, EngineError> {
        Ok(self.query().teleport(point)?)
    }

    /// Teleport every point in order, across `threads` workers.
    pub fn fly(&self, track: &[TrackPoint]) -> Result<Vec<RealityPoint>, EngineError> {
        Ok(self.query().fly_parallel(track, self.config.threads)?)
    }
}
