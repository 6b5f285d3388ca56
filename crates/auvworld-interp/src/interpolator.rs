//! 4-D multilinear interpolant for one canonical variable.

use crate::axis::Axis;
use crate::error::InterpError;
use auvworld_store::GridDataset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longitude range a grid is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LonConvention {
    /// -180..180
    Signed,
    /// 0..360
    Positive,
}

impl LonConvention {
    pub fn of(longitudes: &[f64]) -> Self {
        if longitudes.iter().any(|lon| *lon > 180.0) {
            Self::Positive
        } else {
            Self::Signed
        }
    }

    pub fn normalize(self, lon: f64) -> f64 {
        match self {
            Self::Signed if (-180.0..=180.0).contains(&lon) => lon,
            Self::Signed => (lon + 180.0).rem_euclid(360.0) - 180.0,
            Self::Positive if (0.0..=360.0).contains(&lon) => lon,
            Self::Positive => lon.rem_euclid(360.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolator {
    canonical: String,
    source: String,
    data_id: String,
    source_variable: String,
    lon_convention: LonConvention,
    lon: Axis,
    lat: Axis,
    depth: Axis,
    /// Seconds since the Unix epoch.
    time: Axis,
    /// C order `[time][depth][lat][lon]`.
    values: Vec<f64>,
}

impl Interpolator {
    /// Build from one variable of a grid.
    ///
    /// Fails with [`InterpError::Degenerate`] when the variable has no finite
    /// value or the grid has a single depth level.
    pub fn from_grid(
        grid: &GridDataset,
        source_variable: &str,
        canonical: &str,
        source: &str,
        data_id: &str,
    ) -> Result<Self, InterpError> {
        let degenerate = |reason: &str| InterpError::Degenerate {
            canonical: canonical.to_string(),
            data_id: data_id.to_string(),
            reason: reason.to_string(),
        };
        let variable = grid.variable(source_variable).ok_or_else(|| {
            InterpError::Grid(format!("{data_id} has no variable {source_variable}"))
        })?;
        if grid.depth.len() <= 1 {
            return Err(degenerate("single depth level"));
        }
        if variable.values.len() != grid.cell_count() {
            return Err(InterpError::Grid(format!(
                "{data_id}: {source_variable} has {} values for shape {:?}",
                variable.values.len(),
                grid.shape()
            )));
        }
        if !variable.values.iter().any(|v| v.is_finite()) {
            return Err(degenerate("no finite values"));
        }

        let lon_convention = LonConvention::of(&grid.longitude);
        Ok(Self {
            canonical: canonical.to_string(),
            source: source.to_string(),
            data_id: data_id.to_string(),
            source_variable: source_variable.to_string(),
            lon_convention,
            lon: Axis::new("longitude", grid.longitude.clone())?.wrapping_if_closed(360.0),
            lat: Axis::new("latitude", grid.latitude.clone())?,
            depth: Axis::new("depth", grid.depth.clone())?,
            time: Axis::new("time", grid.time_seconds())?,
            values: variable.values.clone(),
        })
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    pub fn source_variable(&self) -> &str {
        &self.source_variable
    }

    pub fn lon_convention(&self) -> LonConvention {
        self.lon_convention
    }

    pub fn is_global(&self) -> bool {
        self.lon.is_wrapping()
    }

    /// Whether the value buffer holds exactly one sample per grid cell.
    pub fn is_consistent(&self) -> bool {
        let shape = self.shape();
        shape.iter().all(|&len| len > 0) && self.values.len() == shape.iter().product::<usize>()
    }

    /// `[time, depth, lat, lon]`
    pub fn shape(&self) -> [usize; 4] {
        [
            self.time.len(),
            self.depth.len(),
            self.lat.len(),
            self.lon.len(),
        ]
    }

    pub fn evaluate(&self, lon: f64, lat: f64, depth: f64, time: DateTime<Utc>) -> f64 {
        self.evaluate_seconds(lon, lat, depth, time.timestamp_millis() as f64 / 1000.0)
    }

    /// Multilinear value at a point; NaN outside the grid or when any
    /// contributing corner is NaN.
    pub fn evaluate_seconds(&self, lon: f64, lat: f64, depth: f64, seconds: f64) -> f64 {
        let lon = self.lon_convention.normalize(lon);
        let (Some(bx), Some(by), Some(bz), Some(bt)) = (
            self.lon.bracket(lon),
            self.lat.bracket(lat),
            self.depth.bracket(depth),
            self.time.bracket(seconds),
        ) else {
            return f64::NAN;
        };
        let [_, nd, ny, nx] = self.shape();

        let mut total = 0.0;
        for (t, wt) in bt.corners() {
            for (d, wd) in bz.corners() {
                for (y, wy) in by.corners() {
                    for (x, wx) in bx.corners() {
                        let weight = wt * wd * wy * wx;
                        if weight == 0.0 {
                            continue;
                        }
                        let value = self.values[((t * nd + d) * ny + y) * nx + x];
                        if value.is_nan() {
                            return f64::NAN;
                        }
                        total += weight * value;
                    }
                }
            }
        }
        total
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use auvworld_store::GridVariable;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    /// Grid whose `uo` is `lon + lat + depth + days since 2019-01-01`.
    pub(crate) fn linear_grid(longitude: Vec<f64>, start: DateTime<Utc>, days: i64) -> GridDataset {
        let latitude = vec![55.0, 57.0, 59.0];
        let depth = vec![0.5, 10.0, 50.0, 300.0];
        let time: Vec<_> = (0..days).map(|d| start + Duration::days(d)).collect();
        let origin = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let mut values = Vec::new();
        for t in &time {
            let day = (*t - origin).num_seconds() as f64 / 86_400.0;
            for d in &depth {
                for y in &latitude {
                    for x in &longitude {
                        values.push(x + y + d + day);
                    }
                }
            }
        }
        GridDataset {
            attributes: BTreeMap::new(),
            longitude,
            latitude,
            depth,
            time,
            variables: BTreeMap::from([(
                "uo".to_string(),
                GridVariable {
                    units: Some("m s-1".to_string()),
                    fill_value: None,
                    values,
                },
            )]),
        }
    }

    impl Interpolator {
        pub(crate) fn with_values_truncated(mut self, len: usize) -> Self {
            self.values.truncate(len);
            self
        }
    }

    fn jan(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn reproduces_linear_fields() {
        let grid = linear_grid(vec![5.0, 6.0, 7.0, 8.0], jan(1, 0), 7);
        let interp = Interpolator::from_grid(&grid, "uo", "eastward_velocity", "archive", "nws").unwrap();
        let value = interp.evaluate(6.4, 57.1, 12.0, jan(3, 12));
        assert!((value - (6.4 + 57.1 + 12.0 + 2.5)).abs() < 1e-9, "{value}");
        assert_eq!(interp.shape(), [7, 4, 3, 4]);
        assert!(!interp.is_global());
        assert!(interp.is_consistent());
        assert!(!interp.with_values_truncated(10).is_consistent());
    }

    #[test]
    fn out_of_grid_is_nan() {
        let grid = linear_grid(vec![5.0, 6.0, 7.0, 8.0], jan(1, 0), 7);
        let interp = Interpolator::from_grid(&grid, "uo", "eastward_velocity", "archive", "nws").unwrap();
        assert!(interp.evaluate(9.0, 57.0, 12.0, jan(3, 0)).is_nan());
        assert!(interp.evaluate(6.0, 57.0, 400.0, jan(3, 0)).is_nan());
        assert!(interp.evaluate(6.0, 57.0, 0.1, jan(3, 0)).is_nan());
        assert!(interp.evaluate(6.0, 57.0, 12.0, jan(9, 0)).is_nan());
    }

    #[test]
    fn nan_corner_poisons_only_its_cell() {
        let mut grid = linear_grid(vec![5.0, 6.0, 7.0, 8.0], jan(1, 0), 7);
        let index = grid.flat_index(2, 1, 1, 1);
        grid.variables.get_mut("uo").unwrap().values[index] = f64::NAN;
        let interp = Interpolator::from_grid(&grid, "uo", "eastward_velocity", "archive", "nws").unwrap();
        assert!(interp.evaluate(6.4, 57.1, 12.0, jan(3, 0)).is_nan());
        // Exactly on a neighbouring sample the NaN corner has zero weight.
        let on_sample = interp.evaluate(7.0, 57.0, 10.0, jan(3, 0));
        assert!((on_sample - (7.0 + 57.0 + 10.0 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn positive_longitude_grid_accepts_signed_queries() {
        let grid = linear_grid(vec![350.0, 355.0, 359.0], jan(1, 0), 3);
        let interp = Interpolator::from_grid(&grid, "uo", "eastward_velocity", "cmems", "ds").unwrap();
        assert_eq!(interp.lon_convention(), LonConvention::Positive);
        let value = interp.evaluate(-3.0, 57.0, 10.0, jan(2, 0));
        assert!((value - (357.0 + 57.0 + 10.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn global_grid_wraps_across_antimeridian() {
        let longitude: Vec<f64> = (0..4).map(|i| -180.0 + i as f64 * 90.0).collect();
        let mut grid = linear_grid(longitude, jan(1, 0), 3);
        // Constant in longitude so the seam is continuous.
        let values = &mut grid.variables.get_mut("uo").unwrap().values;
        for value in values.iter_mut() {
            *value = 1.5;
        }
        let interp = Interpolator::from_grid(&grid, "uo", "eastward_velocity", "cmems", "glo").unwrap();
        assert!(interp.is_global());
        assert!((interp.evaluate(179.0, 57.0, 10.0, jan(2, 0)) - 1.5).abs() < 1e-12);
        assert_eq!(interp.evaluate(540.0, 57.0, 10.0, jan(2, 0)), 1.5);
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        let mut flat = linear_grid(vec![5.0, 6.0], jan(1, 0), 2);
        flat.depth = vec![0.5];
        let cells = flat.cell_count();
        flat.variables.get_mut("uo").unwrap().values.truncate(cells);
        assert!(matches!(
            Interpolator::from_grid(&flat, "uo", "eastward_velocity", "s", "flat"),
            Err(InterpError::Degenerate { .. })
        ));

        let mut empty = linear_grid(vec![5.0, 6.0], jan(1, 0), 2);
        for value in empty.variables.get_mut("uo").unwrap().values.iter_mut() {
            *value = f64::NAN;
        }
        assert!(matches!(
            Interpolator::from_grid(&empty, "uo", "eastward_velocity", "s", "empty"),
            Err(InterpError::Degenerate { .. })
        ));
    }

    #[test]
    fn longitude_normalization() {
        assert_eq!(LonConvention::Signed.normalize(190.0), -170.0);
        assert_eq!(LonConvention::Signed.normalize(180.0), 180.0);
        assert_eq!(LonConvention::Positive.normalize(-10.0), 350.0);
        assert_eq!(LonConvention::Positive.normalize(370.0), 10.0);
    }
}
