//! # auvworld engine
//!
//! Runs one mission's world resolution end to end.
//!
//! ```text
//! EngineConfig + track ──► Extent ──► CatalogMatcher ──► Fetcher
//!                                                          │
//!            RealityQuery ◄── EngineState ◄── InterpolatorBuilder
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod trajectory;

pub use config::EngineConfig;
pub use engine::{BuildReport, Engine, EngineState, FetchSummary};
pub use error::EngineError;
pub use trajectory::{read_track, read_track_from_path, write_reality};
