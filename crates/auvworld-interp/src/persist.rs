//! On-disk interpolator cache (bincode + zstd).
//!
//! Layout: `{root}/{mission_id}/{source}_{canonical}.lerp`. Each file
//! carries a format version and the digest of the dataset variable it was
//! built from; a mismatch on either means rebuild.

use crate::error::InterpError;
use crate::interpolator::Interpolator;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const LERP_FORMAT_VERSION: u32 = 1;
pub const LERP_EXTENSION: &str = "lerp";
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Serialize)]
struct CachedRef<'a> {
    format_version: u32,
    digest: &'a str,
    interpolator: &'a Interpolator,
}

#[derive(Deserialize)]
struct Cached {
    format_version: u32,
    digest: String,
    interpolator: Interpolator,
}

#[derive(Debug, Clone)]
pub struct InterpolatorCache {
    root: PathBuf,
    mission_id: String,
}

impl InterpolatorCache {
    pub fn new(root: impl Into<PathBuf>, mission_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            mission_id: mission_id.into(),
        }
    }

    pub fn mission_dir(&self) -> PathBuf {
        self.root.join(file_safe(&self.mission_id))
    }

    pub fn path_for(&self, source: &str, canonical: &str) -> PathBuf {
        self.mission_dir().join(format!(
            "{}_{}.{LERP_EXTENSION}",
            file_safe(source),
            file_safe(canonical)
        ))
    }

    /// A cached interpolator built from data with `digest`, if one is valid.
    ///
    /// Missing, stale, unreadable and malformed files all read as `None`.
    pub fn load(&self, source: &str, canonical: &str, digest: &str) -> Option<Interpolator> {
        let path = self.path_for(source, canonical);
        if !path.exists() {
            return None;
        }
        match read_cached(&path) {
            Ok(cached) if cached.format_version != LERP_FORMAT_VERSION => {
                debug!(path = %path.display(), version = cached.format_version, "cache format changed");
                None
            }
            Ok(cached) if cached.digest != digest => {
                debug!(path = %path.display(), "cached interpolator built from other data");
                None
            }
            Ok(cached) if !cached.interpolator.is_consistent() => {
                warn!(path = %path.display(), "cached interpolator does not match its axes");
                None
            }
            Ok(cached) => Some(cached.interpolator),
            Err(err) => {
                warn!("ignoring unreadable interpolator cache: {err}");
                None
            }
        }
    }

    pub fn store(
        &self,
        source: &str,
        canonical: &str,
        digest: &str,
        interpolator: &Interpolator,
    ) -> Result<PathBuf, InterpError> {
        let path = self.path_for(source, canonical);
        let serialized = bincode::serialize(&CachedRef {
            format_version: LERP_FORMAT_VERSION,
            digest,
            interpolator,
        })
        .map_err(|e| InterpError::cache(path.display(), e))?;
        let compressed = zstd::encode_all(&serialized[..], COMPRESSION_LEVEL)
            .map_err(|e| InterpError::cache(path.display(), e))?;
        debug!(
            path = %path.display(),
            raw = serialized.len(),
            compressed = compressed.len(),
            "writing interpolator cache"
        );
        write_atomic(&path, &compressed)?;
        Ok(path)
    }
}

fn read_cached(path: &Path) -> Result<Cached, InterpError> {
    let compressed = fs::read(path).map_err(|e| InterpError::cache(path.display(), e))?;
    let serialized =
        zstd::decode_all(&compressed[..]).map_err(|e| InterpError::cache(path.display(), e))?;
    bincode::deserialize(&serialized).map_err(|e| InterpError::cache(path.display(), e))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), InterpError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| InterpError::cache(parent.display(), e))?;
    }
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    let tmp = PathBuf::from(tmp);
    if let Err(err) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(InterpError::cache(tmp.display(), err));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        InterpError::cache(path.display(), e)
    })
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
