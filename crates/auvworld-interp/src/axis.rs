//! Monotonic coordinate axes and bracketing.

use crate::error::InterpError;
use serde::{Deserialize, Serialize};

/// Slack when deciding a longitude axis closes the full circle.
const WRAP_TOLERANCE_DEG: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    values: Vec<f64>,
    descending: bool,
    /// Period of a wrapping axis (360 for global longitudes).
    period: Option<f64>,
}

/// The two samples around a coordinate and the weight of `upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    pub upper: usize,
    pub weight: f64,
}

impl Bracket {
    fn exact(index: usize) -> Self {
        Self {
            lower: index,
            upper: index,
            weight: 0.0,
        }
    }

    /// `(index, weight)` for both neighbours.
    pub fn corners(self) -> [(usize, f64); 2] {
        [(self.lower, 1.0 - self.weight), (self.upper, self.weight)]
    }
}

impl Axis {
    pub fn new(name: &str, values: Vec<f64>) -> Result<Self, InterpError> {
        if values.is_empty() {
            return Err(InterpError::Grid(format!("{name} axis is empty")));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(InterpError::Grid(format!(
                "{name} axis has non-finite values"
            )));
        }
        let ascending = values.windows(2).all(|pair| pair[1] > pair[0]);
        let descending = values.len() > 1 && values.windows(2).all(|pair| pair[1] < pair[0]);
        if !ascending && !descending {
            return Err(InterpError::Grid(format!(
                "{name} axis is not strictly monotonic"
            )));
        }
        Ok(Self {
            values,
            descending,
            period: None,
        })
    }

    /// Mark an ascending axis as wrapping when its samples close `period`.
    pub fn wrapping_if_closed(mut self, period: f64) -> Self {
        let n = self.values.len();
        if n >= 2 && !self.descending {
            let span = self.values[n - 1] - self.values[0];
            let spacing = span / (n - 1) as f64;
            if span + spacing >= period - WRAP_TOLERANCE_DEG && span < period {
                self.period = Some(period);
            }
        }
        self
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_wrapping(&self) -> bool {
        self.period.is_some()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Locate `x`, or `None` when it falls outside the axis.
    pub fn bracket(&self, x: f64) -> Option<Bracket> {
        if !x.is_finite() {
            return None;
        }
        let values = &self.values;
        let n = values.len();
        let first = values[0];
        let last = values[n - 1];
        if n == 1 {
            return (x == first).then(|| Bracket::exact(0));
        }

        let below = if self.descending {
            values.partition_point(|v| *v >= x)
        } else {
            values.partition_point(|v| *v <= x)
        };
        if below == n {
            if x == last {
                return Some(Bracket::exact(n - 1));
            }
            return self.wrap(x);
        }
        if below == 0 {
            return self.wrap(x);
        }
        let (lower, upper) = (below - 1, below);
        let weight = (x - values[lower]) / (values[upper] - values[lower]);
        Some(Bracket {
            lower,
            upper,
            weight,
        })
    }

    /// Bracket across the seam between the last sample and the first.
    fn wrap(&self, x: f64) -> Option<Bracket> {
        let period = self.period?;
        let n = self.values.len();
        let first = self.values[0];
        let last = self.values[n - 1];
        let x = if x < first { x + period } else { x };
        let seam_end = first + period;
        if x < last || x > seam_end {
            return None;
        }
        Some(Bracket {
            lower: n - 1,
            upper: 0,
            weight: (x - last) / (seam_end - last),
        })
    }
}
