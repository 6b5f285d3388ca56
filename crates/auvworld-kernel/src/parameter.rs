//! Canonical parameter inventory.
//!
//! Maps engine-internal variable names to the literal names providers use,
//! and links each parameter to alternates that may stand in for it.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const EASTWARD_VELOCITY: &str = "eastward_velocity";
pub const NORTHWARD_VELOCITY: &str = "northward_velocity";
pub const UPWARD_VELOCITY: &str = "upward_velocity";
pub const EASTWARD_TOTAL_VELOCITY: &str = "eastward_total_velocity";
pub const NORTHWARD_TOTAL_VELOCITY: &str = "northward_total_velocity";
pub const TEMPERATURE: &str = "temperature";
pub const SALINITY: &str = "salinity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParameterEntry {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub alternates: Vec<String>,
    /// Optional parameters may be missing from the built interpolator set.
    #[serde(default)]
    pub optional: bool,
    /// Value substituted for NaNs just below the surface.
    #[serde(default)]
    pub surface_default: f64,
}

impl ParameterEntry {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            alternates: Vec::new(),
            optional: false,
            surface_default: 0.0,
        }
    }

    pub fn with_alternates(mut self, alternates: &[&str]) -> Self {
        self.alternates = alternates.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_surface_default(mut self, value: f64) -> Self {
        self.surface_default = value;
        self
    }

    pub fn has_alias(&self, source_name: &str) -> bool {
        self.aliases.iter().any(|alias| alias == source_name)
    }
}

/// How a provider variable satisfied a required canonical parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasMatch {
    Primary,
    /// Matched through the named alternate parameter's aliases.
    Alternate(String),
}

/// Read-only lookup table, loaded once per process.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInventory {
    entries: BTreeMap<String, ParameterEntry>,
}

impl ParameterInventory {
    /// Build an inventory, rejecting duplicate names and dangling alternates.
    pub fn from_entries(entries: Vec<ParameterEntry>) -> Result<Self, KernelError> {
        let mut index = BTreeMap::new();
        for entry in entries {
            let name = entry.canonical.trim().to_string();
            if name.is_empty() {
                return Err(KernelError::ParameterTable(
                    "canonical name must be non-empty".to_string(),
                ));
            }
            if index.contains_key(&name) {
                return Err(KernelError::ParameterTable(format!(
                    "duplicate canonical parameter {name}"
                )));
            }
            index.insert(name, entry);
        }
        for entry in index.values() {
            for alternate in &entry.alternates {
                if alternate == &entry.canonical {
                    return Err(KernelError::ParameterTable(format!(
                        "{} lists itself as an alternate",
                        entry.canonical
                    )));
                }
                if !index.contains_key(alternate) {
                    return Err(KernelError::ParameterTable(format!(
                        "{} lists unknown alternate {alternate}",
                        entry.canonical
                    )));
                }
            }
        }
        Ok(Self { entries: index })
    }

    /// The built-in ocean-physics table.
    pub fn builtin() -> Self {
        let entries = vec![
            ParameterEntry::new(
                EASTWARD_VELOCITY,
                &["uo", "u", "water_u", "eastward_sea_water_velocity"],
            )
            .with_alternates(&[EASTWARD_TOTAL_VELOCITY]),
            ParameterEntry::new(
                NORTHWARD_VELOCITY,
                &["vo", "v", "water_v", "northward_sea_water_velocity"],
            )
            .with_alternates(&[NORTHWARD_TOTAL_VELOCITY]),
            ParameterEntry::new(UPWARD_VELOCITY, &["wo", "w", "upward_sea_water_velocity"])
                .optional(),
            ParameterEntry::new(EASTWARD_TOTAL_VELOCITY, &["utotal"]).optional(),
            ParameterEntry::new(NORTHWARD_TOTAL_VELOCITY, &["vtotal"]).optional(),
            ParameterEntry::new(
                TEMPERATURE,
                &["thetao", "temp", "sea_water_potential_temperature"],
            )
            .optional()
            .with_surface_default(10.0),
            ParameterEntry::new(SALINITY, &["so", "salt", "sea_water_salinity"])
                .optional()
                .with_surface_default(35.0),
        ];
        match Self::from_entries(entries) {
            Ok(inventory) => inventory,
            Err(err) => unreachable!("built-in parameter table is consistent: {err}"),
        }
    }

    pub fn get(&self, canonical: &str) -> Option<&ParameterEntry> {
        self.entries.get(canonical)
    }

    pub fn require(&self, canonical: &str) -> Result<&ParameterEntry, KernelError> {
        self.get(canonical)
            .ok_or_else(|| KernelError::UnknownParameter(canonical.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.values()
    }

    pub fn is_optional(&self, canonical: &str) -> bool {
        self.get(canonical).is_some_and(|entry| entry.optional)
    }

    /// Canonical names of every non-optional parameter.
    pub fn required_names(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| !entry.optional)
            .map(|entry| entry.canonical.clone())
            .collect()
    }

    /// Decide whether `source_name` can supply `required`.
    ///
    /// Primary aliases win over alternates; alternates are tried in
    /// declaration order.
    pub fn match_alias(&self, required: &str, source_name: &str) -> Option<AliasMatch> {
        let entry = self.get(required)?;
        if entry.has_alias(source_name) {
            return Some(AliasMatch::Primary);
        }
        entry
            .alternates
            .iter()
            .filter_map(|name| self.get(name))
            .find(|alternate| alternate.has_alias(source_name))
            .map(|alternate| AliasMatch::Alternate(alternate.canonical.clone()))
    }
}

impl Default for ParameterInventory {
    fn default() -> Self {
        Self::builtin()
    }
}
