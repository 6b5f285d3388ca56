//! Point queries ("teleport") against a finished interpolator set.

use crate::builder::InterpolatorSet;
use crate::error::InterpError;
use auvworld_kernel::{ParameterInventory, TrackPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_SURFACE_THRESHOLD_M: f64 = 0.5;

/// What a NaN means at a given depth.
///
/// Above the threshold the parameter's surface default is used; at or below
/// it a NaN is an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingDataPolicy {
    pub surface_threshold_m: f64,
}

impl Default for MissingDataPolicy {
    fn default() -> Self {
        Self {
            surface_threshold_m: DEFAULT_SURFACE_THRESHOLD_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealityPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    /// Canonical variable to value.
    pub values: BTreeMap<String, f64>,
}

pub struct RealityQuery<'a> {
    interpolators: &'a InterpolatorSet,
    inventory: &'a ParameterInventory,
    expected: Vec<String>,
    policy: MissingDataPolicy,
}

impl<'a> RealityQuery<'a> {
    pub fn new(
        interpolators: &'a InterpolatorSet,
        inventory: &'a ParameterInventory,
        expected: Vec<String>,
    ) -> Self {
        Self {
            interpolators,
            inventory,
            expected,
            policy: MissingDataPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MissingDataPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    pub fn teleport(&self, point: &TrackPoint) -> Result<RealityPoint, InterpError> {
        let mut values = BTreeMap::new();
        for canonical in &self.expected {
            let Some(interpolator) = self.interpolators.get(canonical) else {
                if self.inventory.is_optional(canonical) {
                    continue;
                }
                return Err(InterpError::MissingInterpolator(canonical.clone()));
            };
            let value = interpolator.evaluate(point.lon, point.lat, point.depth, point.time);
            let value = if value.is_nan() {
                self.fill_missing(canonical, point)?
            } else {
                value
            };
            values.insert(canonical.clone(), value);
        }
        Ok(RealityPoint {
            time: point.time,
            lat: point.lat,
            lon: point.lon,
            depth: point.depth,
            values,
        })
    }

    fn fill_missing(&self, canonical: &str, point: &TrackPoint) -> Result<f64, InterpError> {
        if point.depth >= self.policy.surface_threshold_m {
            return Err(InterpError::NullData {
                canonical: canonical.to_string(),
                lat: point.lat,
                lon: point.lon,
                depth: point.depth,
                time: point.time.to_rfc3339(),
            });
        }
        let default = self
            .inventory
            .get(canonical)
            .map(|entry| entry.surface_default)
            .unwrap_or(0.0);
        debug!(canonical, depth = point.depth, default, "surface default substituted");
        Ok(default)
    }

    /// Teleport every point in order, stopping at the first failure.
    pub fn fly(&self, points: &[TrackPoint]) -> Result<Vec<RealityPoint>, InterpError> {
        points.iter().map(|point| self.teleport(point)).collect()
    }

    /// [`fly`](Self::fly) across `threads` scoped workers; output order and
    /// the reported failure match the sequential run.
    pub fn fly_parallel(
        &self,
        points: &[TrackPoint],
        threads: usize,
    ) -> Result<Vec<RealityPoint>, InterpError> {
        let threads = threads.max(1);
        if threads == 1 || points.len() < 2 {
            return self.fly(points);
        }
        let chunk = points.len().div_ceil(threads);
        let results: Vec<Result<Vec<RealityPoint>, InterpError>> = std::thread::scope(|scope| {
            let workers: Vec<_> = points
                .chunks(chunk)
                .map(|slice| scope.spawn(move || self.fly(slice)))
                .collect();
            workers
                .into_iter()
                .map(|worker| match worker.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        let mut out = Vec::with_capacity(points.len());
        for result in results {
            out.extend(result?);
        }
        Ok(out)
    }
}
