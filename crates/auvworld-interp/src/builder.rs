//! Turn fetched datasets into at most one interpolator per canonical variable.
//!
//! Datasets are offered worst field-type rank first, then by id. Each
//! offer goes through [`InterpolatorPriorities::resolve`]: a strictly
//! higher-priority incumbent keeps its slot, otherwise the candidate is
//! built (or loaded from the on-disk cache) and takes it. With equal
//! priorities the better-ranked dataset is therefore offered last and wins.

use crate::error::InterpError;
use crate::interpolator::Interpolator;
use crate::persist::InterpolatorCache;
use auvworld_kernel::{
    CatalogPriorities, InterpolatorPriorities, MatchedWorld, MatchedWorlds, ParameterInventory,
    Resolution,
};
use auvworld_store::DatasetHandle;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Active interpolators keyed by canonical variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpolatorSet(BTreeMap<String, Interpolator>);

impl InterpolatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, canonical: &str) -> Option<&Interpolator> {
        self.0.get(canonical)
    }

    pub fn insert(&mut self, interpolator: Interpolator) -> Option<Interpolator> {
        self.0
            .insert(interpolator.canonical().to_string(), interpolator)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interpolator> {
        self.0.values()
    }

    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildAction {
    Built,
    LoadedFromCache,
    /// A higher-priority source already backs the variable.
    Skipped,
    /// Nothing usable; the slot was left alone.
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    pub canonical: String,
    pub data_id: String,
    pub source: String,
    pub priority: i64,
    pub action: BuildAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub struct InterpolatorBuilder<'a> {
    priorities: &'a CatalogPriorities,
    inventory: &'a ParameterInventory,
    cache: Option<&'a InterpolatorCache>,
}

impl<'a> InterpolatorBuilder<'a> {
    pub fn new(priorities: &'a CatalogPriorities, inventory: &'a ParameterInventory) -> Self {
        Self {
            priorities,
            inventory,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a InterpolatorCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Offer every fetched dataset's variables to `table`, recording the
    /// winners in `set`.
    pub fn build(
        &self,
        worlds: &MatchedWorlds,
        handles: &[DatasetHandle],
        table: &mut InterpolatorPriorities,
        set: &mut InterpolatorSet,
    ) -> Result<Vec<BuildEvent>, InterpError> {
        let mut offers: Vec<(&MatchedWorld, &DatasetHandle)> = Vec::new();
        for handle in handles {
            match worlds.get(&handle.data_id) {
                Some(world) => offers.push((world, handle)),
                None => warn!(dataset = %handle.data_id, "fetched dataset has no matched world"),
            }
        }
        offers.sort_by_key(|(world, _)| (Reverse(world.rank()), world.data_id.clone()));

        let mut events = Vec::new();
        for (world, handle) in offers {
            let priority = self
                .priorities
                .get(&world.source)
                .ok_or_else(|| InterpError::UnknownSourceKey(world.source.clone()))?;
            for (source_variable, canonical) in &world.variable_alias {
                if let Some(primary) = self.primary_alias(world, canonical)
                    && primary != source_variable
                {
                    debug!(
                        canonical = %canonical,
                        dataset = %world.data_id,
                        alternate = %source_variable,
                        primary,
                        "alternate shadowed by primary alias"
                    );
                    events.push(BuildEvent {
                        canonical: canonical.clone(),
                        data_id: world.data_id.clone(),
                        source: world.source.clone(),
                        priority,
                        action: BuildAction::Declined,
                        detail: Some(format!("{source_variable} shadowed by {primary}")),
                    });
                    continue;
                }
                let mut declined = None;
                let resolution = table.resolve(canonical, &world.source, priority, || {
                    self.produce(world, handle, source_variable, canonical, &mut declined)
                })?;
                let (action, detail) = match resolution {
                    Resolution::Skipped { incumbent } => {
                        debug!(
                            canonical = %canonical,
                            dataset = %world.data_id,
                            incumbent = %incumbent.source,
                            "higher-priority source already active"
                        );
                        (
                            BuildAction::Skipped,
                            Some(format!("{} (priority {})", incumbent.source, incumbent.priority)),
                        )
                    }
                    Resolution::Declined => (BuildAction::Declined, declined),
                    Resolution::Adopted {
                        value: (interpolator, action),
                        replaced,
                    } => {
                        info!(
                            canonical = %canonical,
                            dataset = %world.data_id,
                            source = %world.source,
                            priority,
                            "interpolator active"
                        );
                        set.insert(interpolator);
                        (action, replaced.map(|old| format!("replaced {}", old.source)))
                    }
                };
                events.push(BuildEvent {
                    canonical: canonical.clone(),
                    data_id: world.data_id.clone(),
                    source: world.source.clone(),
                    priority,
                    action,
                    detail,
                });
            }
        }
        Ok(events)
    }

    /// The world's primary-alias variable for `canonical`, if it has one.
    fn primary_alias<'w>(&self, world: &'w MatchedWorld, canonical: &str) -> Option<&'w str> {
        let entry = self.inventory.get(canonical)?;
        world
            .variable_alias
            .iter()
            .find(|(name, supplied)| *supplied == canonical && entry.has_alias(name))
            .map(|(name, _)| name.as_str())
    }

    fn produce(
        &self,
        world: &MatchedWorld,
        handle: &DatasetHandle,
        source_variable: &str,
        canonical: &str,
        declined: &mut Option<String>,
    ) -> Result<Option<(Interpolator, BuildAction)>, InterpError> {
        let Some(digest) = handle.dataset.variable_digest(source_variable) else {
            warn!(dataset = %world.data_id, variable = source_variable, "variable missing from fetched dataset");
            *declined = Some(format!("{source_variable} missing from dataset"));
            return Ok(None);
        };
        if let Some(cache) = self.cache
            && let Some(interpolator) = cache.load(&world.source, canonical, &digest)
        {
            debug!(canonical, dataset = %world.data_id, "loaded interpolator from cache");
            return Ok(Some((interpolator, BuildAction::LoadedFromCache)));
        }
        let interpolator = match Interpolator::from_grid(
            &handle.dataset,
            source_variable,
            canonical,
            &world.source,
            &world.data_id,
        ) {
            Ok(interpolator) => interpolator,
            Err(InterpError::Degenerate { reason, .. }) => {
                warn!(canonical, dataset = %world.data_id, "skipping degenerate dataset: {reason}");
                *declined = Some(reason);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if let Some(cache) = self.cache
            && let Err(err) = cache.store(&world.source, canonical, &digest, &interpolator)
        {
            warn!("interpolator not cached: {err}");
        }
        Ok(Some((interpolator, BuildAction::Built)))
    }
}
