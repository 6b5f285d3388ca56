//! # auvworld catalog
//!
//! Finds the datasets that can supply a mission's required variables over
//! its extent. Three backends feed one result set keyed by dataset id:
//!
//! - [`remote`]: provider describe documents (typed, then flattened)
//! - [`local`]: directory trees of gridded files, judged by their contents
//! - [`metadata`]: flat JSON catalogs pointing at local files
//!
//! Every backend applies the same containment rule: the dataset's box must
//! contain the extent on all four sides, edges included.

pub mod error;
pub mod local;
pub mod matcher;
pub mod metadata;
pub mod remote;

pub use error::{CatalogError, MatchRejection};
pub use matcher::{CatalogMatcher, VariableMatch, resolve_variable};
pub use remote::{DescribeDocument, VariableCandidate, load_describe};
