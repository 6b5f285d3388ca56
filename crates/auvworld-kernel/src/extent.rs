//! Validated spatial/temporal/depth bounding box for a mission's data needs.
//!
//! An [`Extent`] is immutable once constructed: every constructor validates
//! the bounds and the fields are only reachable through accessors.

use crate::error::KernelError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const LAT_LIMIT: f64 = 90.0;
pub const LON_LIMIT: f64 = 180.0;

/// One trajectory sample: where the vehicle was, and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Metres below the surface, positive down.
    pub depth: f64,
}

/// Padding added around a trajectory's bounding values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Margins {
    pub spatial_deg: f64,
    pub depth_m: f64,
    /// Applied on both sides so interpolation always sees two time samples.
    pub time_days: i64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            spatial_deg: 0.5,
            depth_m: 100.0,
            time_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawExtent")]
pub struct Extent {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    depth_max: f64,
    time_start: DateTime<Utc>,
    time_end: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtent {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    depth_max: f64,
    time_start: DateTime<Utc>,
    time_end: DateTime<Utc>,
}

impl TryFrom<RawExtent> for Extent {
    type Error = KernelError;

    fn try_from(raw: RawExtent) -> Result<Self, Self::Error> {
        Extent::new(
            raw.lat_min,
            raw.lat_max,
            raw.lon_min,
            raw.lon_max,
            raw.depth_max,
            raw.time_start,
            raw.time_end,
        )
    }
}

impl Extent {
    /// Build a validated extent. Depth always starts at the surface.
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        depth_max: f64,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
    ) -> Result<Self, KernelError> {
        check_range("lat_min", lat_min, LAT_LIMIT)?;
        check_range("lat_max", lat_max, LAT_LIMIT)?;
        check_range("lon_min", lon_min, LON_LIMIT)?;
        check_range("lon_max", lon_max, LON_LIMIT)?;
        if lat_min > lat_max {
            return Err(KernelError::validation(
                "lat_min",
                format!("{lat_min} exceeds lat_max {lat_max}"),
            ));
        }
        if lon_min > lon_max {
            return Err(KernelError::validation(
                "lon_min",
                format!("{lon_min} exceeds lon_max {lon_max}"),
            ));
        }
        if !depth_max.is_finite() || depth_max < 0.0 {
            return Err(KernelError::validation(
                "depth_max",
                format!("must be a finite depth >= 0, got {depth_max}"),
            ));
        }
        if time_start > time_end {
            return Err(KernelError::validation(
                "time_start",
                format!("{time_start} is after time_end {time_end}"),
            ));
        }
        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            depth_max,
            time_start,
            time_end,
        })
    }

    /// Derive the padded extent of a trajectory.
    ///
    /// Spatial padding is clamped to the valid lat/lon range instead of
    /// being rejected; the trajectory itself must already be in range.
    pub fn from_track(points: &[TrackPoint], margins: &Margins) -> Result<Self, KernelError> {
        let Some(first) = points.first() else {
            return Err(KernelError::validation("trajectory", "no points"));
        };
        if margins.spatial_deg < 0.0 || margins.depth_m < 0.0 || margins.time_days < 0 {
            return Err(KernelError::validation(
                "margins",
                format!("margins must be non-negative, got {margins:?}"),
            ));
        }

        let mut lat = (first.lat, first.lat);
        let mut lon = (first.lon, first.lon);
        let mut depth_max = first.depth;
        let mut time = (first.time, first.time);
        for point in points {
            check_range("lat", point.lat, LAT_LIMIT)?;
            check_range("lon", point.lon, LON_LIMIT)?;
            if !point.depth.is_finite() {
                return Err(KernelError::validation(
                    "depth",
                    format!("non-finite depth at {}", point.time),
                ));
            }
            lat = (lat.0.min(point.lat), lat.1.max(point.lat));
            lon = (lon.0.min(point.lon), lon.1.max(point.lon));
            depth_max = depth_max.max(point.depth);
            time = (time.0.min(point.time), time.1.max(point.time));
        }

        let pad = Duration::days(margins.time_days);
        Self::new(
            (lat.0 - margins.spatial_deg).max(-LAT_LIMIT),
            (lat.1 + margins.spatial_deg).min(LAT_LIMIT),
            (lon.0 - margins.spatial_deg).max(-LON_LIMIT),
            (lon.1 + margins.spatial_deg).min(LON_LIMIT),
            depth_max.max(0.0) + margins.depth_m,
            time.0 - pad,
            time.1 + pad,
        )
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn depth_max(&self) -> f64 {
        self.depth_max
    }

    pub fn time_start(&self) -> DateTime<Utc> {
        self.time_start
    }

    pub fn time_end(&self) -> DateTime<Utc> {
        self.time_end
    }

    pub fn time_start_ms(&self) -> i64 {
        self.time_start.timestamp_millis()
    }

    pub fn time_end_ms(&self) -> i64 {
        self.time_end.timestamp_millis()
    }

    /// Whether a `[lon_min, lat_min, lon_max, lat_max]` box contains this
    /// extent on all four sides (inclusive).
    pub fn is_within_bbox(&self, bbox: [f64; 4]) -> bool {
        let [lon_min, lat_min, lon_max, lat_max] = bbox;
        lon_min <= self.lon_min
            && lat_min <= self.lat_min
            && lon_max >= self.lon_max
            && lat_max >= self.lat_max
    }

    /// Whether `[start_ms, end_ms]` covers this extent's time range.
    pub fn is_within_time_ms(&self, start_ms: i64, end_ms: i64) -> bool {
        start_ms <= self.time_start_ms() && end_ms >= self.time_end_ms()
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), KernelError> {
    if !value.is_finite() || value < -limit || value > limit {
        return Err(KernelError::validation(
            field,
            format!("{value} outside [-{limit}, {limit}]"),
        ));
    }
    Ok(())
}
