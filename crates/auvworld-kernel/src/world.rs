//! Candidate datasets ("matched worlds") and their merge semantics.

use crate::field_type::{DomainType, FieldType};
use crate::source::WorldType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::PathBuf;

/// One dataset that satisfies at least one required variable over an extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedWorld {
    pub data_id: String,
    /// Name of the `SourceConfig` this world was found under.
    pub source: String,
    pub world_type: WorldType,
    pub domain: DomainType,
    pub dataset_name: String,
    #[serde(default)]
    pub resolution: Option<String>,
    pub field_type: FieldType,
    /// Provider variable name to the canonical variable it supplies.
    pub variable_alias: BTreeMap<String, String>,
    /// Canonical variable to the alternate that supplied it, if any.
    pub alternative_parameter: BTreeMap<String, Option<String>>,
    /// Dataset file for worlds opened in place rather than fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
}

impl MatchedWorld {
    /// Record that `source_var` supplies `canonical`, directly when
    /// `alternate` is `None` or through the named alternate parameter.
    ///
    /// A primary alias displaces alternate aliases already recorded for the
    /// same canonical variable; an alternate is ignored once a primary is
    /// present. The outcome does not depend on insertion order.
    pub fn add_variable(
        &mut self,
        source_var: String,
        canonical: String,
        alternate: Option<String>,
    ) {
        if self.variable_alias.contains_key(&source_var) {
            return;
        }
        let recorded_alternate = self.alternative_parameter.get(&canonical).map(Option::is_some);
        match (recorded_alternate, alternate.is_some()) {
            (Some(false), true) => return,
            (Some(true), false) => {
                self.variable_alias.retain(|_, supplied| *supplied != canonical);
                self.alternative_parameter.insert(canonical.clone(), None);
            }
            (None, _) => {
                self.alternative_parameter.insert(canonical.clone(), alternate);
            }
            _ => {}
        }
        self.variable_alias.insert(source_var, canonical);
    }

    /// Fold a rediscovered entry for the same dataset into this one.
    ///
    /// The better-ranked field type is kept and aliases are unioned through
    /// [`MatchedWorld::add_variable`], so primary aliases win over alternates.
    pub fn merge(&mut self, other: MatchedWorld) {
        debug_assert_eq!(self.data_id, other.data_id);
        self.field_type = self.field_type.best(other.field_type);
        if self.resolution.is_none() {
            self.resolution = other.resolution;
        }
        let MatchedWorld {
            variable_alias,
            alternative_parameter,
            ..
        } = other;
        for (source_var, canonical) in variable_alias {
            let alternate = alternative_parameter.get(&canonical).cloned().flatten();
            self.add_variable(source_var, canonical, alternate);
        }
    }

    pub fn rank(&self) -> u32 {
        self.field_type.rank()
    }

    /// Canonical variables this world can supply.
    pub fn canonical_variables(&self) -> impl Iterator<Item = &str> {
        self.alternative_parameter.keys().map(String::as_str)
    }

    /// Provider variable names to request when fetching.
    pub fn source_variables(&self) -> Vec<String> {
        self.variable_alias.keys().cloned().collect()
    }
}

/// Result set of a catalog search, keyed by dataset id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedWorlds(BTreeMap<String, MatchedWorld>);

impl MatchedWorlds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new candidate or merge it into the entry with the same id.
    pub fn insert_or_merge(&mut self, world: MatchedWorld) {
        match self.0.entry(world.data_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(world);
            }
            Entry::Occupied(mut slot) => slot.get_mut().merge(world),
        }
    }

    /// Merge another result set into this one.
    pub fn extend(&mut self, other: MatchedWorlds) {
        for world in other.0.into_values() {
            self.insert_or_merge(world);
        }
    }

    pub fn get(&self, data_id: &str) -> Option<&MatchedWorld> {
        self.0.get(data_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchedWorld> {
        self.0.values()
    }

    pub fn into_vec(self) -> Vec<MatchedWorld> {
        self.0.into_values().collect()
    }

    /// Canonical variables no matched world can supply.
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        required
            .into_iter()
            .filter(|name| {
                !self
                    .iter()
                    .any(|world| world.alternative_parameter.contains_key(*name))
            })
            .map(ToOwned::to_owned)
            .collect()
    }
}

impl FromIterator<MatchedWorld> for MatchedWorlds {
    fn from_iter<I: IntoIterator<Item = MatchedWorld>>(iter: I) -> Self {
        let mut worlds = Self::new();
        for world in iter {
            worlds.insert_or_merge(world);
        }
        worlds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(field_type: FieldType, aliases: &[(&str, &str)]) -> MatchedWorld {
        MatchedWorld {
            data_id: "cmems_mod_nws_phy-uv_anfc_0.027deg-3D_P1D-m".to_string(),
            source: "cmems".to_string(),
            world_type: WorldType::RemoteCatalog,
            domain: DomainType::Regional,
            dataset_name: "NWS currents".to_string(),
            resolution: Some("0.027deg".to_string()),
            field_type,
            variable_alias: aliases
                .iter()
                .map(|(s, c)| (s.to_string(), c.to_string()))
                .collect(),
            alternative_parameter: aliases
                .iter()
                .map(|(_, c)| (c.to_string(), None))
                .collect(),
            local_dir: None,
        }
    }

    #[test]
    fn merge_keeps_better_rank_and_unions_maps() {
        let mut a = world(FieldType::DailyMean, &[("uo", "eastward_velocity")]);
        let b = world(
            FieldType::HourlyInstantaneous,
            &[("vo", "northward_velocity")],
        );
        a.merge(b);
        assert_eq!(a.field_type, FieldType::HourlyInstantaneous);
        assert_eq!(a.variable_alias.len(), 2);
        assert_eq!(a.alternative_parameter.len(), 2);
    }

    #[test]
    fn merge_does_not_overwrite_existing_keys() {
        let mut a = world(FieldType::DailyMean, &[("uo", "eastward_velocity")]);
        let mut b = world(FieldType::DailyMean, &[("uo", "eastward_velocity")]);
        b.alternative_parameter.insert(
            "eastward_velocity".to_string(),
            Some("eastward_total_velocity".to_string()),
        );
        a.merge(b);
        assert_eq!(a.alternative_parameter["eastward_velocity"], None);
    }

    fn alternate_world(source_var: &str, canonical: &str, alternate: &str) -> MatchedWorld {
        let mut w = world(FieldType::HourlyInstantaneous, &[]);
        w.add_variable(
            source_var.to_string(),
            canonical.to_string(),
            Some(alternate.to_string()),
        );
        w
    }

    #[test]
    fn primary_alias_displaces_alternate_in_either_order() {
        let primary = world(FieldType::DailyMean, &[("uo", "eastward_velocity")]);
        let total = alternate_world("utotal", "eastward_velocity", "eastward_total_velocity");

        let mut a = primary.clone();
        a.merge(total.clone());
        let mut b = total;
        b.merge(primary);

        for merged in [&a, &b] {
            assert_eq!(
                merged.variable_alias,
                BTreeMap::from([("uo".to_string(), "eastward_velocity".to_string())])
            );
            assert_eq!(merged.alternative_parameter["eastward_velocity"], None);
        }
    }

    #[test]
    fn alternate_only_world_keeps_its_alternate() {
        let mut w = alternate_world("utotal", "eastward_velocity", "eastward_total_velocity");
        w.merge(world(FieldType::DailyMean, &[("vo", "northward_velocity")]));
        assert_eq!(w.variable_alias["utotal"], "eastward_velocity");
        assert_eq!(
            w.alternative_parameter["eastward_velocity"].as_deref(),
            Some("eastward_total_velocity")
        );
        assert_eq!(w.source_variables(), vec!["utotal", "vo"]);
    }

    #[test]
    fn merge_is_commutative_on_maps() {
        let a = world(FieldType::MonthlyMean, &[("uo", "eastward_velocity")]);
        let b = world(
            FieldType::DailyMean,
            &[("vo", "northward_velocity"), ("wo", "upward_velocity")],
        );

        let ab: MatchedWorlds = [a.clone(), b.clone()].into_iter().collect();
        let ba: MatchedWorlds = [b, a].into_iter().collect();
        let left = ab.get(&ab.iter().next().unwrap().data_id).unwrap();
        let right = ba.get(&left.data_id).unwrap();
        assert_eq!(left.variable_alias, right.variable_alias);
        assert_eq!(left.alternative_parameter, right.alternative_parameter);
        assert_eq!(left.field_type, right.field_type);
        assert_eq!(ab.len(), 1);
    }

    #[test]
    fn missing_lists_unsupplied_variables() {
        let worlds: MatchedWorlds = [world(FieldType::DailyMean, &[("uo", "eastward_velocity")])]
            .into_iter()
            .collect();
        assert_eq!(
            worlds.missing(["eastward_velocity", "northward_velocity"]),
            vec!["northward_velocity".to_string()]
        );
    }
}
