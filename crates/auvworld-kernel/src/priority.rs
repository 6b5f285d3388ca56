//! Priority arbitration between sources offering the same canonical variable.
//!
//! The table holds one entry per canonical variable: the source currently
//! backing its active interpolator. Check, build and update happen inside a
//! single `&mut` borrow, so two candidates can never both believe they won.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backing {
    pub source: String,
    pub priority: i64,
}

/// Outcome of offering a candidate source for one variable.
#[derive(Debug)]
pub enum Resolution<T> {
    /// An incumbent with strictly greater priority keeps the slot.
    Skipped { incumbent: Backing },
    /// The candidate was eligible but produced nothing usable.
    Declined,
    /// The candidate now backs the variable.
    Adopted { value: T, replaced: Option<Backing> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolatorPriorities(BTreeMap<String, Backing>);

/// Skip iff an interpolator exists and its priority strictly exceeds the
/// candidate's. Equal priority proceeds, so the later candidate wins ties.
pub fn should_skip(
    canonical: &str,
    candidate_priority: i64,
    priorities: &InterpolatorPriorities,
) -> bool {
    priorities
        .backing(canonical)
        .is_some_and(|existing| existing.priority > candidate_priority)
}

impl InterpolatorPriorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backing(&self, canonical: &str) -> Option<&Backing> {
        self.0.get(canonical)
    }

    pub fn should_skip(&self, canonical: &str, candidate_priority: i64) -> bool {
        should_skip(canonical, candidate_priority, self)
    }

    /// Offer `source` for `canonical`, running `build` only when eligible.
    ///
    /// `build` returns `Ok(None)` for a degenerate result; the slot is then
    /// left untouched. Errors propagate without touching the slot either.
    pub fn resolve<T, E>(
        &mut self,
        canonical: &str,
        source: &str,
        priority: i64,
        build: impl FnOnce() -> Result<Option<T>, E>,
    ) -> Result<Resolution<T>, E> {
        if let Some(incumbent) = self.0.get(canonical)
            && incumbent.priority > priority
        {
            return Ok(Resolution::Skipped {
                incumbent: incumbent.clone(),
            });
        }
        let Some(value) = build()? else {
            return Ok(Resolution::Declined);
        };
        let replaced = self.0.insert(
            canonical.to_string(),
            Backing {
                source: source.to_string(),
                priority,
            },
        );
        Ok(Resolution::Adopted { value, replaced })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Backing)> {
        self.0.iter().map(|(name, backing)| (name.as_str(), backing))
    }
}
