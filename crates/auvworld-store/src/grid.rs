//! In-memory gridded dataset on rectilinear (lon, lat, depth, time) axes.
//!
//! Variable values are stored flat in C order `[time][depth][lat][lon]`.
//! On disk (`.grid.json`) NaNs are written as `null`.

use crate::error::StoreError;
use crate::subset::SubsetRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDataset {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    /// Metres, positive down.
    pub depth: Vec<f64>,
    pub time: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub variables: BTreeMap<String, GridVariable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<f64>,
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
}

/// Lightweight description used when scanning archives for candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProbe {
    pub attributes: BTreeMap<String, String>,
    pub variables: Vec<String>,
    /// Native coordinate values; may be flattened 2-D arrays.
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub depth_len: usize,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl GridDataset {
    /// `[time, depth, lat, lon]`
    pub fn shape(&self) -> [usize; 4] {
        [
            self.time.len(),
            self.depth.len(),
            self.latitude.len(),
            self.longitude.len(),
        ]
    }

    pub fn cell_count(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn flat_index(&self, t: usize, d: usize, y: usize, x: usize) -> usize {
        let [_, nd, ny, nx] = self.shape();
        ((t * nd + d) * ny + y) * nx + x
    }

    pub fn variable(&self, name: &str) -> Option<&GridVariable> {
        self.variables.get(name)
    }

    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((*self.time.first()?, *self.time.last()?))
    }

    /// Check axis monotonicity and variable lengths.
    pub fn validate(&self) -> Result<(), StoreError> {
        check_axis("longitude", &self.longitude)?;
        check_axis("latitude", &self.latitude)?;
        check_axis("depth", &self.depth)?;
        let seconds: Vec<f64> = self.time_seconds();
        check_axis("time", &seconds)?;
        if seconds.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(StoreError::Malformed(
                "time axis must be strictly increasing".to_string(),
            ));
        }
        let expected = self.cell_count();
        for (name, variable) in &self.variables {
            if variable.values.len() != expected {
                return Err(StoreError::Malformed(format!(
                    "variable {name} has {} values, grid shape {:?} needs {expected}",
                    variable.values.len(),
                    self.shape()
                )));
            }
        }
        Ok(())
    }

    /// Replace each variable's declared fill value with NaN.
    pub fn mask_fill_values(&mut self) {
        for variable in self.variables.values_mut() {
            let Some(fill) = variable.fill_value else {
                continue;
            };
            for value in &mut variable.values {
                if is_fill(*value, fill) {
                    *value = f64::NAN;
                }
            }
        }
    }

    /// Mask a source-level fill value that the file itself does not declare.
    pub fn mask_value(&mut self, fill: f64) {
        for variable in self.variables.values_mut() {
            for value in &mut variable.values {
                if is_fill(*value, fill) {
                    *value = f64::NAN;
                }
            }
        }
    }

    pub fn time_seconds(&self) -> Vec<f64> {
        self.time
            .iter()
            .map(|t| t.timestamp_millis() as f64 / 1000.0)
            .collect()
    }

    pub fn probe(&self) -> DatasetProbe {
        DatasetProbe {
            attributes: self.attributes.clone(),
            variables: self.variables.keys().cloned().collect(),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            depth_len: self.depth.len(),
            time_range: self.time_range(),
        }
    }

    /// Hex digest of the axes plus one variable's values.
    pub fn variable_digest(&self, name: &str) -> Option<String> {
        let variable = self.variables.get(name)?;
        let mut hasher = Sha256::new();
        for (label, axis) in [
            ("longitude", &self.longitude),
            ("latitude", &self.latitude),
            ("depth", &self.depth),
        ] {
            hasher.update(label.as_bytes());
            for value in axis {
                hasher.update(value.to_le_bytes());
            }
        }
        hasher.update(b"time");
        for t in &self.time {
            hasher.update(t.timestamp_millis().to_le_bytes());
        }
        hasher.update(name.as_bytes());
        for value in &variable.values {
            hasher.update(value.to_bits().to_le_bytes());
        }
        Some(format!("{:x}", hasher.finalize()))
    }

    /// Cut the requested variables and box out of this grid.
    ///
    /// Each axis keeps one bracketing sample beyond the requested range when
    /// available, so interpolation right at the box edges stays defined.
    pub fn subset(&self, request: &SubsetRequest) -> Result<GridDataset, StoreError> {
        self.validate()?;
        for name in &request.variables {
            if !self.variables.contains_key(name) {
                return Err(StoreError::Fetch {
                    dataset_id: request.dataset_id.clone(),
                    message: format!("variable {name} not present in dataset"),
                });
            }
        }

        let lon_range = self.longitude_range(request.lon_min, request.lon_max)?;
        let lat_range = bracket_range(&self.latitude, request.lat_min, request.lat_max)
            .ok_or_else(|| StoreError::Malformed("empty latitude axis".to_string()))?;
        let depth_range = bracket_range(&self.depth, request.depth_min, request.depth_max)
            .ok_or_else(|| StoreError::Malformed("empty depth axis".to_string()))?;
        let time_range = bracket_range(
            &self.time_seconds(),
            request.time_start.timestamp_millis() as f64 / 1000.0,
            request.time_end.timestamp_millis() as f64 / 1000.0,
        )
        .ok_or_else(|| StoreError::Malformed("empty time axis".to_string()))?;

        let mut variables = BTreeMap::new();
        for name in &request.variables {
            let source = &self.variables[name];
            let mut values = Vec::new();
            for t in time_range.clone() {
                for d in depth_range.clone() {
                    for y in lat_range.clone() {
                        for x in lon_range.clone() {
                            values.push(source.values[self.flat_index(t, d, y, x)]);
                        }
                    }
                }
            }
            variables.insert(
                name.clone(),
                GridVariable {
                    units: source.units.clone(),
                    fill_value: None,
                    values,
                },
            );
        }

        Ok(GridDataset {
            attributes: self.attributes.clone(),
            longitude: self.longitude[lon_range].to_vec(),
            latitude: self.latitude[lat_range].to_vec(),
            depth: self.depth[depth_range].to_vec(),
            time: self.time[time_range].to_vec(),
            variables,
        })
    }

    fn longitude_range(&self, lo: f64, hi: f64) -> Result<RangeInclusive<usize>, StoreError> {
        let full = 0..=self.longitude.len().saturating_sub(1);
        let grid_max = self
            .longitude
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = if grid_max > 180.0 {
            (wrap_to_positive(lo), wrap_to_positive(hi))
        } else {
            (lo, hi)
        };
        if lo > hi {
            // Box straddles the grid's seam; keep every column.
            return Ok(full);
        }
        bracket_range(&self.longitude, lo, hi)
            .ok_or_else(|| StoreError::Malformed("empty longitude axis".to_string()))
    }
}

fn wrap_to_positive(lon: f64) -> f64 {
    if lon < 0.0 { lon + 360.0 } else { lon }
}

fn is_fill(value: f64, fill: f64) -> bool {
    value == fill || (fill.abs() > 1e30 && (value - fill).abs() <= fill.abs() * 1e-6)
}

fn check_axis(name: &str, axis: &[f64]) -> Result<(), StoreError> {
    if axis.is_empty() {
        return Err(StoreError::Malformed(format!("{name} axis is empty")));
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::Malformed(format!(
            "{name} axis has non-finite values"
        )));
    }
    let ascending = axis.windows(2).all(|pair| pair[1] > pair[0]);
    let descending = axis.windows(2).all(|pair| pair[1] < pair[0]);
    if !ascending && !descending {
        return Err(StoreError::Malformed(format!(
            "{name} axis is not strictly monotonic"
        )));
    }
    Ok(())
}

/// Smallest contiguous index range covering `[lo, hi]` plus one neighbour
/// on each side. Works for ascending and descending axes.
pub(crate) fn bracket_range(axis: &[f64], lo: f64, hi: f64) -> Option<RangeInclusive<usize>> {
    let mut inside: Option<(usize, usize)> = None;
    let mut below: Option<(usize, f64)> = None;
    let mut above: Option<(usize, f64)> = None;
    for (idx, &value) in axis.iter().enumerate() {
        if value >= lo && value <= hi {
            inside = Some(match inside {
                Some((first, last)) => (first.min(idx), last.max(idx)),
                None => (idx, idx),
            });
        } else if value < lo {
            if below.is_none_or(|(_, best)| value > best) {
                below = Some((idx, value));
            }
        } else if above.is_none_or(|(_, best)| value < best) {
            above = Some((idx, value));
        }
    }
    let candidates = [
        inside.map(|(first, _)| first),
        inside.map(|(_, last)| last),
        below.map(|(idx, _)| idx),
        above.map(|(idx, _)| idx),
    ];
    let start = candidates.iter().flatten().min()?;
    let end = candidates.iter().flatten().max()?;
    Some(*start..=*end)
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            values
                .iter()
                .map(|value| value.is_finite().then_some(*value)),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// 4 lon x 3 lat x 3 depth x 4 time grid with value = lon + lat + depth + day.
    pub(crate) fn sample_grid() -> GridDataset {
        let longitude = vec![5.0, 6.0, 7.0, 8.0];
        let latitude = vec![55.0, 57.0, 59.0];
        let depth = vec![0.5, 10.0, 300.0];
        let start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let time: Vec<_> = (0..4).map(|day| start + Duration::days(day)).collect();
        let mut values = Vec::new();
        for day in 0..4 {
            for d in &depth {
                for y in &latitude {
                    for x in &longitude {
                        values.push(x + y + d + day as f64);
                    }
                }
            }
        }
        let mut variables = BTreeMap::new();
        variables.insert(
            "uo".to_string(),
            GridVariable {
                units: Some("m s-1".to_string()),
                fill_value: None,
                values,
            },
        );
        GridDataset {
            attributes: BTreeMap::from([("title".to_string(), "daily mean".to_string())]),
            longitude,
            latitude,
            depth,
            time,
            variables,
        }
    }

    #[test]
    fn validate_accepts_sample_and_rejects_bad_lengths() {
        let mut grid = sample_grid();
        grid.validate().expect("sample grid is valid");
        grid.variables.get_mut("uo").unwrap().values.pop();
        assert!(matches!(grid.validate(), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn validate_rejects_non_monotonic_axes() {
        let mut grid = sample_grid();
        grid.latitude = vec![55.0, 59.0, 57.0];
        assert!(grid.validate().is_err());
    }

    #[test]
    fn mask_fill_values_turns_fill_into_nan() {
        let mut grid = sample_grid();
        let variable = grid.variables.get_mut("uo").unwrap();
        variable.fill_value = Some(-32767.0);
        variable.values[0] = -32767.0;
        grid.mask_fill_values();
        assert!(grid.variables["uo"].values[0].is_nan());
        assert!(grid.variables["uo"].values[1].is_finite());
    }

    #[test]
    fn json_roundtrip_keeps_nan_as_null() {
        let mut grid = sample_grid();
        grid.variables.get_mut("uo").unwrap().values[3] = f64::NAN;
        let text = serde_json::to_string(&grid).expect("grid serializes");
        assert!(text.contains("null"));
        let back: GridDataset = serde_json::from_str(&text).expect("grid parses");
        assert!(back.variables["uo"].values[3].is_nan());
        assert_eq!(back.longitude, grid.longitude);
    }

    #[test]
    fn bracket_range_adds_neighbours() {
        let axis = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(bracket_range(&axis, 1.5, 2.5), Some(1..=3));
        assert_eq!(bracket_range(&axis, 2.0, 2.0), Some(1..=3));
        assert_eq!(bracket_range(&axis, -5.0, 10.0), Some(0..=4));
        let descending = [4.0, 3.0, 2.0, 1.0, 0.0];
        assert_eq!(bracket_range(&descending, 1.5, 2.5), Some(1..=3));
        assert_eq!(bracket_range(&[], 0.0, 1.0), None);
    }

    #[test]
    fn subset_cuts_box_with_brackets() {
        let grid = sample_grid();
        let request = SubsetRequest {
            dataset_id: "sample".to_string(),
            variables: vec!["uo".to_string()],
            lon_min: 6.2,
            lon_max: 6.8,
            lat_min: 56.0,
            lat_max: 58.0,
            depth_min: 0.0,
            depth_max: 5.0,
            time_start: grid.time[1],
            time_end: grid.time[2],
        };
        let cut = grid.subset(&request).expect("subset succeeds");
        assert_eq!(cut.longitude, vec![6.0, 7.0]);
        assert_eq!(cut.latitude, vec![55.0, 57.0, 59.0]);
        assert_eq!(cut.depth, vec![0.5, 10.0]);
        assert_eq!(cut.time, grid.time[0..=3].to_vec());
        cut.validate().expect("subset is a valid grid");
        let first = cut.variables["uo"].values[0];
        assert_eq!(first, 6.0 + 55.0 + 0.5);
    }

    #[test]
    fn subset_rejects_missing_variable() {
        let grid = sample_grid();
        let request = SubsetRequest {
            dataset_id: "sample".to_string(),
            variables: vec!["thetao".to_string()],
            lon_min: 6.0,
            lon_max: 7.0,
            lat_min: 56.0,
            lat_max: 58.0,
            depth_min: 0.0,
            depth_max: 5.0,
            time_start: grid.time[0],
            time_end: grid.time[1],
        };
        assert!(matches!(grid.subset(&request), Err(StoreError::Fetch { .. })));
    }

    #[test]
    fn digest_changes_with_values() {
        let grid = sample_grid();
        let before = grid.variable_digest("uo").unwrap();
        let mut changed = grid.clone();
        changed.variables.get_mut("uo").unwrap().values[0] += 1.0;
        assert_ne!(before, changed.variable_digest("uo").unwrap());
        assert_eq!(before, grid.variable_digest("uo").unwrap());
        assert!(grid.variable_digest("vo").is_none());
    }
}
