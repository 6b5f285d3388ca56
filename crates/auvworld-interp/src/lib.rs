//! # auvworld interp
//!
//! From fetched grids to answers at a point.
//!
//! ```text
//! DatasetHandle ──► InterpolatorBuilder ──► InterpolatorSet ──► RealityQuery
//!                    │  (priority resolve)     (one per var)     (teleport / fly)
//!                    └─► InterpolatorCache (.lerp, bincode + zstd)
//! ```

pub mod axis;
pub mod builder;
pub mod error;
pub mod interpolator;
pub mod persist;
pub mod reality;

pub use axis::{Axis, Bracket};
pub use builder::{BuildAction, BuildEvent, InterpolatorBuilder, InterpolatorSet};
pub use error::InterpError;
pub use interpolator::{Interpolator, LonConvention};
pub use persist::{InterpolatorCache, LERP_FORMAT_VERSION};
pub use reality::{MissingDataPolicy, RealityPoint, RealityQuery};
