//! Remote catalog describe documents.
//!
//! The document nests provider entries, products, datasets, versions, parts,
//! services and variables. It is deserialized once into typed structs and
//! flattened into [`VariableCandidate`]s, which are then filtered one rule
//! at a time.

use crate::error::{CatalogError, MatchRejection};
use crate::matcher::{VariableMatch, resolve_variable};
use auvworld_kernel::{
    Extent, MatchedWorld, MatchedWorlds, ParameterInventory, WorldType, parse_dataset_tags,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const NUMERICAL_MODELS: &str = "Numerical models";
pub const ARRAY_SERVICE_FORMAT: &str = "zarr";
const INTERIM_MARKER: &str = "myint";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescribeDocument {
    Providers(Vec<ProviderEntry>),
    Single(ProviderEntry),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: String,
    #[serde(default)]
    pub dataset_name: String,
    #[serde(default)]
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub service_format: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub short_name: String,
    #[serde(default)]
    pub standard_name: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    /// `[lon_min, lat_min, lon_max, lat_max]`
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub coordinate_id: String,
    #[serde(default)]
    pub values: Option<Vec<f64>>,
    #[serde(default)]
    pub minimum_value: Option<f64>,
    #[serde(default)]
    pub maximum_value: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub coordinate_unit: Option<String>,
}

impl Coordinate {
    /// Number of samples, when it can be told from the description.
    pub fn len(&self) -> Option<usize> {
        if let Some(values) = &self.values {
            return Some(values.len());
        }
        let (min, max) = (self.minimum_value?, self.maximum_value?);
        if min == max {
            return Some(1);
        }
        match self.step {
            Some(step) if step > 0.0 => Some(((max - min) / step).round() as usize + 1),
            _ => Some(2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// `(min, max)` of the axis in its own unit.
    pub fn range(&self) -> Option<(f64, f64)> {
        if let Some(values) = &self.values {
            let min = values.iter().copied().reduce(f64::min)?;
            let max = values.iter().copied().reduce(f64::max)?;
            return Some((min, max));
        }
        Some((self.minimum_value?, self.maximum_value?))
    }

    /// Time range in epoch milliseconds.
    ///
    /// The unit reads `<step> since <reference>`; a missing reference means
    /// the Unix epoch and a missing unit means milliseconds. An unknown step
    /// or an unparseable reference yields `None`.
    pub fn time_range_ms(&self) -> Option<(i64, i64)> {
        let (min, max) = self.range()?;
        let (scale, epoch_ms) =
            parse_time_unit(self.coordinate_unit.as_deref().unwrap_or_default())?;
        let to_ms = |value: f64| epoch_ms + (value * scale).round() as i64;
        Some((to_ms(min), to_ms(max)))
    }
}

/// Split a CF-style time unit into milliseconds per step and the reference
/// instant in epoch milliseconds.
fn parse_time_unit(unit: &str) -> Option<(f64, i64)> {
    let unit = unit.trim();
    let (step, reference) = match unit.to_ascii_lowercase().find(" since ") {
        Some(at) => (&unit[..at], Some(&unit[at + " since ".len()..])),
        None => (unit, None),
    };
    let scale = match step.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "second" | "seconds" => 1_000.0,
        "min" | "minute" | "minutes" => 60_000.0,
        "h" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        _ => return None,
    };
    let epoch_ms = match reference {
        Some(text) => parse_reference(text)?.timestamp_millis(),
        None => 0,
    };
    Some((scale, epoch_ms))
}

/// Reference instants such as `1950-01-01 00:00:00`, `1970-01-01T00:00:00Z`
/// or `1900-01-01`, optionally followed by a parenthesised note.
fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    let text = text.split('(').next()?.trim().trim_end_matches(['Z', 'z']);
    let text = text.trim().replacen('T', " ", 1);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
        .map(|naive| naive.and_utc())
}

impl Variable {
    pub fn coordinate(&self, id: &str) -> Option<&Coordinate> {
        self.coordinates.iter().find(|c| c.coordinate_id == id)
    }
}

/// One provider variable together with everything that encloses it.
#[derive(Debug, Clone, Copy)]
pub struct VariableCandidate<'a> {
    pub product: &'a Product,
    pub dataset: &'a Dataset,
    pub service: &'a Service,
    pub variable: &'a Variable,
}

impl DescribeDocument {
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        let providers: &[ProviderEntry] = match self {
            Self::Providers(providers) => providers,
            Self::Single(provider) => std::slice::from_ref(provider),
        };
        providers.iter().flat_map(|provider| provider.products.iter())
    }

    /// Every variable of an array-capable service of a numerical-model
    /// product.
    pub fn candidates(&self) -> impl Iterator<Item = VariableCandidate<'_>> {
        self.products()
            .filter(|product| product.sources.iter().any(|s| s == NUMERICAL_MODELS))
            .flat_map(|product| {
                product.datasets.iter().flat_map(move |dataset| {
                    dataset
                        .versions
                        .iter()
                        .flat_map(|version| version.parts.iter())
                        .flat_map(|part| part.services.iter())
                        .filter(|service| {
                            service.service_format.as_deref() == Some(ARRAY_SERVICE_FORMAT)
                        })
                        .flat_map(move |service| {
                            service.variables.iter().map(move |variable| VariableCandidate {
                                product,
                                dataset,
                                service,
                                variable,
                            })
                        })
                })
            })
    }
}

/// Load a describe document from an `http(s)` URL or a local JSON file.
pub fn load_describe(location: &str, timeout: Duration) -> Result<DescribeDocument, CatalogError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        debug!(url = location, "downloading catalog describe document");
        let fetch_err = |message: String| CatalogError::Fetch {
            url: location.to_string(),
            message,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| fetch_err(e.to_string()))?;
        return client
            .get(location)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?
            .json()
            .map_err(|e| CatalogError::parse(location, e));
    }
    let path = Path::new(location);
    let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| CatalogError::parse(path.display(), e))
}

/// Apply the remote matching rules to one candidate.
pub fn evaluate(
    candidate: &VariableCandidate<'_>,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> Result<MatchedWorld, MatchRejection> {
    let VariableCandidate {
        product,
        dataset,
        variable,
        ..
    } = *candidate;
    let VariableMatch {
        canonical,
        alternate,
    } = resolve_variable(inventory, required, &variable.short_name)
        .ok_or_else(|| MatchRejection::NoAlias(variable.short_name.clone()))?;

    if dataset.dataset_id.contains(INTERIM_MARKER) {
        return Err(MatchRejection::Interim);
    }
    let depth_len = variable.coordinate("depth").and_then(Coordinate::len);
    if depth_len.is_none_or(|len| len <= 1) {
        return Err(MatchRejection::FlatDepth);
    }
    let bbox = variable.bbox.ok_or(MatchRejection::NoCoordinates)?;
    if !extent.is_within_bbox(bbox) {
        return Err(MatchRejection::OutsideBbox(bbox));
    }
    let (start_ms, end_ms) = variable
        .coordinate("time")
        .and_then(Coordinate::time_range_ms)
        .ok_or(MatchRejection::NoTime)?;
    if !extent.is_within_time_ms(start_ms, end_ms) {
        return Err(MatchRejection::OutsideTime);
    }
    let tags = parse_dataset_tags(&dataset.dataset_id)?;

    if let Some(alternate) = &alternate {
        info!(
            dataset = %dataset.dataset_id,
            canonical = %canonical,
            substitute = %alternate,
            "using alternate parameter"
        );
    }
    let dataset_name = if dataset.dataset_name.is_empty() {
        product.title.clone()
    } else {
        dataset.dataset_name.clone()
    };
    let mut world = MatchedWorld {
        data_id: dataset.dataset_id.clone(),
        source: source.to_string(),
        world_type: WorldType::RemoteCatalog,
        domain: tags.domain,
        dataset_name,
        resolution: tags.resolution,
        field_type: tags.field_type,
        variable_alias: BTreeMap::new(),
        alternative_parameter: BTreeMap::new(),
        local_dir: None,
    };
    world.add_variable(variable.short_name.clone(), canonical, alternate);
    Ok(world)
}

/// Match every candidate in `document`, merging per dataset id.
pub fn match_document(
    document: &DescribeDocument,
    required: &[String],
    extent: &Extent,
    inventory: &ParameterInventory,
    source: &str,
) -> MatchedWorlds {
    let mut worlds = MatchedWorlds::new();
    for candidate in document.candidates() {
        match evaluate(&candidate, required, extent, inventory, source) {
            Ok(world) => worlds.insert_or_merge(world),
            Err(MatchRejection::NoAlias(_)) => {}
            Err(rejection @ MatchRejection::Tags(_)) => warn!(
                dataset = %candidate.dataset.dataset_id,
                variable = %candidate.variable.short_name,
                "skipping candidate: {rejection}"
            ),
            Err(rejection) => debug!(
                dataset = %candidate.dataset.dataset_id,
                variable = %candidate.variable.short_name,
                "rejected: {rejection}"
            ),
        }
    }
    worlds
}
