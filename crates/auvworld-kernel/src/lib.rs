//! # auvworld kernel
//!
//! Value types and arbitration rules shared by every stage of world
//! resolution: which box of ocean a mission needs, which provider names mean
//! which physical quantity, which candidate dataset was found, and which
//! source wins when several offer the same variable.
//!
//! ## Architecture
//!
//! ```text
//! Extent                ← validated lat/lon/depth/time box
//!     │
//! ParameterInventory    ← canonical names, aliases, alternates
//!     │
//! SourceConfig          ← provider kind + priority
//!     │
//! MatchedWorld          ← candidate dataset, merged by id
//!     │
//! InterpolatorPriorities← one backing source per canonical variable
//! ```

pub mod error;
pub mod extent;
pub mod field_type;
pub mod parameter;
pub mod priority;
pub mod source;
pub mod world;

pub use error::KernelError;
pub use extent::{Extent, Margins, TrackPoint};
pub use field_type::{
    DatasetTagError, DatasetTags, DomainType, FieldType, GLOBAL_SPAN_TOLERANCE_DEG,
    parse_dataset_tags,
};
pub use parameter::{AliasMatch, ParameterEntry, ParameterInventory};
pub use priority::{Backing, InterpolatorPriorities, Resolution, should_skip};
pub use source::{CatalogPriorities, SourceConfig, SourceKind, WorldType};
pub use world::{MatchedWorld, MatchedWorlds};
