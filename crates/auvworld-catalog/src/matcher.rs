//! Search every configured source for datasets covering a mission.

use crate::error::CatalogError;
use crate::{local, metadata, remote};
use auvworld_kernel::{
    AliasMatch, Extent, MatchedWorlds, ParameterInventory, SourceConfig, SourceKind,
};
use std::time::Duration;
use tracing::info;

/// Canonical variable a provider variable supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMatch {
    pub canonical: String,
    /// Alternate parameter whose alias matched, when not a primary alias.
    pub alternate: Option<String>,
}

/// Map a provider variable onto one required canonical variable.
///
/// A primary alias of any required variable wins over an alternate match;
/// ties go to the first variable in `required`.
pub fn resolve_variable(
    inventory: &ParameterInventory,
    required: &[String],
    source_name: &str,
) -> Option<VariableMatch> {
    let mut alternate_match = None;
    for canonical in required {
        match inventory.match_alias(canonical, source_name) {
            Some(AliasMatch::Primary) => {
                return Some(VariableMatch {
                    canonical: canonical.clone(),
                    alternate: None,
                });
            }
            Some(AliasMatch::Alternate(alternate)) if alternate_match.is_none() => {
                alternate_match = Some(VariableMatch {
                    canonical: canonical.clone(),
                    alternate: Some(alternate),
                });
            }
            _ => {}
        }
    }
    alternate_match
}

pub struct CatalogMatcher<'a> {
    inventory: &'a ParameterInventory,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(inventory: &'a ParameterInventory) -> Self {
        Self { inventory }
    }

    /// Find datasets covering `extent` for any of `required`.
    ///
    /// Finding nothing is not an error. A source whose catalog cannot be
    /// read at all aborts the search.
    pub fn search(
        &self,
        required: &[String],
        extent: &Extent,
        sources: &[SourceConfig],
    ) -> Result<MatchedWorlds, CatalogError> {
        for name in required {
            self.inventory.require(name)?;
        }
        let mut worlds = MatchedWorlds::new();
        for source in sources {
            let found = match &source.kind {
                SourceKind::RemoteCatalog {
                    describe,
                    timeout_secs,
                    ..
                } => {
                    let document =
                        remote::load_describe(describe, Duration::from_secs(*timeout_secs))?;
                    remote::match_document(&document, required, extent, self.inventory, &source.name)
                }
                SourceKind::LocalDirectory { root, fill_value } => local::scan_directory(
                    root,
                    *fill_value,
                    required,
                    extent,
                    self.inventory,
                    &source.name,
                )?,
                SourceKind::MetadataCatalog { path } => {
                    metadata::match_catalog(path, required, extent, self.inventory, &source.name)?
                }
            };
            info!(source = %source.name, matched = found.len(), "catalog search finished");
            worlds.extend(found);
        }
        Ok(worlds)
    }
}
