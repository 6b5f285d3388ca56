//! NetCDF reader (feature `netcdf`).
//!
//! Reads CF-style model output: 1-D or separable 2-D lat/lon coordinates,
//! a depth axis and a `<unit> since <date>` time axis. Only variables laid
//! out as `(time, depth, lat, lon)` are loaded.

use crate::error::StoreError;
use crate::grid::{DatasetProbe, GridDataset, GridVariable};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

const LON_NAMES: &[&str] = &["longitude", "lon", "nav_lon"];
const LAT_NAMES: &[&str] = &["latitude", "lat", "nav_lat"];
const DEPTH_NAMES: &[&str] = &["depth", "deptht", "depthu", "lev", "z"];
const TIME_NAMES: &[&str] = &["time", "time_counter", "t"];

pub fn read(path: &Path) -> Result<GridDataset, StoreError> {
    let file = netcdf::open(path).map_err(|e| StoreError::io(path.display(), e))?;
    let (lat_raw, lat_dims) = coordinate(&file, LAT_NAMES, path)?;
    let (lon_raw, lon_dims) = coordinate(&file, LON_NAMES, path)?;
    let latitude = rectilinear_axis(&lat_raw, &lat_dims, Axis2d::Rows, path)?;
    let longitude = rectilinear_axis(&lon_raw, &lon_dims, Axis2d::Columns, path)?;
    let depth = coordinate(&file, DEPTH_NAMES, path)?.0;
    let time = time_axis(&file, path)?;

    let mut variables = BTreeMap::new();
    for variable in file.variables() {
        if variable.dimensions().len() != 4 {
            continue;
        }
        let name = variable.name();
        let mut values: Vec<f64> = variable
            .get_values::<f64, _>(..)
            .map_err(|e| StoreError::parse(path.display(), format!("{name}: {e}")))?;
        let fill_value = number_attribute(&variable, "_FillValue")
            .or_else(|| number_attribute(&variable, "missing_value"));
        if let Some(fill) = fill_value {
            for value in &mut values {
                if *value == fill {
                    *value = f64::NAN;
                }
            }
        }
        let scale = number_attribute(&variable, "scale_factor").unwrap_or(1.0);
        let offset = number_attribute(&variable, "add_offset").unwrap_or(0.0);
        if scale != 1.0 || offset != 0.0 {
            for value in &mut values {
                *value = *value * scale + offset;
            }
        }
        variables.insert(
            name,
            GridVariable {
                units: string_attribute(&variable, "units"),
                fill_value: None,
                values,
            },
        );
    }

    let grid = GridDataset {
        attributes: global_attributes(&file),
        longitude,
        latitude,
        depth,
        time,
        variables,
    };
    grid.validate()?;
    Ok(grid)
}

pub fn probe(path: &Path) -> Result<DatasetProbe, StoreError> {
    let file = netcdf::open(path).map_err(|e| StoreError::io(path.display(), e))?;
    let latitude = coordinate(&file, LAT_NAMES, path)?.0;
    let longitude = coordinate(&file, LON_NAMES, path)?.0;
    let depth_len = coordinate(&file, DEPTH_NAMES, path)
        .map(|(values, _)| values.len())
        .unwrap_or(0);
    let time_range = time_axis(&file, path)
        .ok()
        .and_then(|axis| Some((*axis.first()?, *axis.last()?)));
    let variables = file
        .variables()
        .filter(|variable| variable.dimensions().len() == 4)
        .map(|variable| variable.name())
        .collect();
    Ok(DatasetProbe {
        attributes: global_attributes(&file),
        variables,
        latitude,
        longitude,
        depth_len,
        time_range,
    })
}

fn coordinate(
    file: &netcdf::File,
    names: &[&str],
    path: &Path,
) -> Result<(Vec<f64>, Vec<usize>), StoreError> {
    let variable = names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| {
            StoreError::Malformed(format!(
                "{}: none of the coordinates {names:?} present",
                path.display()
            ))
        })?;
    let dims = variable.dimensions().iter().map(|dim| dim.len()).collect();
    let values = variable
        .get_values::<f64, _>(..)
        .map_err(|e| StoreError::parse(path.display(), e))?;
    Ok((values, dims))
}

#[derive(Clone, Copy)]
enum Axis2d {
    /// Axis varies down rows (latitude).
    Rows,
    /// Axis varies along columns (longitude).
    Columns,
}

fn rectilinear_axis(
    values: &[f64],
    dims: &[usize],
    along: Axis2d,
    path: &Path,
) -> Result<Vec<f64>, StoreError> {
    match dims {
        [_] => Ok(values.to_vec()),
        [rows, cols] => {
            let (rows, cols) = (*rows, *cols);
            let axis: Vec<f64> = match along {
                Axis2d::Rows => (0..rows).map(|r| values[r * cols]).collect(),
                Axis2d::Columns => values[..cols].to_vec(),
            };
            let separable = (0..rows).all(|r| {
                (0..cols).all(|c| {
                    let expected = match along {
                        Axis2d::Rows => axis[r],
                        Axis2d::Columns => axis[c],
                    };
                    (values[r * cols + c] - expected).abs() < 1e-9
                })
            });
            if separable {
                Ok(axis)
            } else {
                Err(StoreError::Unsupported(format!(
                    "{}: curvilinear grid cannot be interpolated directly",
                    path.display()
                )))
            }
        }
        _ => Err(StoreError::Malformed(format!(
            "{}: coordinate has {} dimensions",
            path.display(),
            dims.len()
        ))),
    }
}

fn time_axis(file: &netcdf::File, path: &Path) -> Result<Vec<DateTime<Utc>>, StoreError> {
    let variable = TIME_NAMES
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| StoreError::Malformed(format!("{}: no time axis", path.display())))?;
    let units = string_attribute(&variable, "units").ok_or_else(|| {
        StoreError::Malformed(format!("{}: time axis has no units", path.display()))
    })?;
    let (step, origin) = parse_time_units(&units).ok_or_else(|| {
        StoreError::Malformed(format!(
            "{}: unsupported time units {units:?}",
            path.display()
        ))
    })?;
    let raw = variable
        .get_values::<f64, _>(..)
        .map_err(|e| StoreError::parse(path.display(), e))?;
    Ok(raw
        .into_iter()
        .map(|offset| origin + Duration::milliseconds((offset * step) as i64))
        .collect())
}

/// `"<unit> since <date>"` to (milliseconds per unit, origin).
fn parse_time_units(units: &str) -> Option<(f64, DateTime<Utc>)> {
    let (unit, origin) = units.split_once(" since ")?;
    let step = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "s" => 1_000.0,
        "minutes" | "minute" => 60_000.0,
        "hours" | "hour" | "h" => 3_600_000.0,
        "days" | "day" | "d" => 86_400_000.0,
        _ => return None,
    };
    let origin = origin.trim().trim_end_matches('Z');
    let naive = NaiveDateTime::parse_from_str(origin, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(origin, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(origin, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some((step, naive.and_utc()))
}

fn global_attributes(file: &netcdf::File) -> BTreeMap<String, String> {
    file.attributes()
        .filter_map(|attr| {
            let name = attr.name().to_string();
            match attr.value().ok()? {
                netcdf::AttributeValue::Str(text) => Some((name, text)),
                _ => None,
            }
        })
        .collect()
}

fn string_attribute(variable: &netcdf::Variable, name: &str) -> Option<String> {
    match variable.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Str(text) => Some(text),
        _ => None,
    }
}

fn number_attribute(variable: &netcdf::Variable, name: &str) -> Option<f64> {
    match variable.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Double(v) => Some(v),
        netcdf::AttributeValue::Float(v) => Some(v as f64),
        netcdf::AttributeValue::Int(v) => Some(v as f64),
        netcdf::AttributeValue::Short(v) => Some(v as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_cf_time_units() {
        let (step, origin) = parse_time_units("hours since 1950-01-01 00:00:00").unwrap();
        assert_eq!(step, 3_600_000.0);
        assert_eq!(origin, Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap());
        let (step, _) = parse_time_units("seconds since 1970-01-01").unwrap();
        assert_eq!(step, 1_000.0);
        assert!(parse_time_units("fortnights since 1970-01-01").is_none());
    }

    #[test]
    fn separable_2d_axes_collapse() {
        let lat = [1.0, 1.0, 2.0, 2.0];
        let lon = [10.0, 11.0, 10.0, 11.0];
        let path = Path::new("x.nc");
        assert_eq!(
            rectilinear_axis(&lat, &[2, 2], Axis2d::Rows, path).unwrap(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            rectilinear_axis(&lon, &[2, 2], Axis2d::Columns, path).unwrap(),
            vec![10.0, 11.0]
        );
        let skewed = [1.0, 1.1, 2.0, 2.0];
        assert!(rectilinear_axis(&skewed, &[2, 2], Axis2d::Rows, path).is_err());
    }
}
