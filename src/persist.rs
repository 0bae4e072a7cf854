//! Result persistence: validate, canonicalize, and write JSON to disk.
//!
//! Output is compact JSON. Re-encoding through [`serde_json::Value`] sorts
//! object keys, so the same data always produces the same bytes.
//!
//! Writes go straight to the target path and replace any existing file. There
//! is no temp-file-and-rename step, so an interrupted write can leave a
//! truncated file behind.

use crate::error::Result;
use crate::fetcher::ResultSet;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Validate an already-serialized JSON payload and write it to `path`
///
/// The payload is parsed, re-serialized in compact canonical form, and
/// written over whatever is at `path`.
///
/// # Errors
///
/// Returns [`Error::Serialization`](crate::Error::Serialization) if the
/// payload is not well-formed JSON (nothing is written in that case) and
/// [`Error::Io`](crate::Error::Io) if the file cannot be written.
///
/// # Examples
///
/// ```
/// use guild_search_dl::persist::persist;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("messages.json");
///
/// persist(br#"[ {"id": "1"} ]"#, &path).unwrap();
/// assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"[{"id":"1"}]"#);
/// ```
pub fn persist(serialized: &[u8], path: &Path) -> Result<()> {
    let value: Value = serde_json::from_slice(serialized)?;
    let canonical = serde_json::to_vec(&value)?;
    std::fs::write(path, &canonical)?;

    debug!(path = %path.display(), bytes = canonical.len(), "Wrote results file");
    Ok(())
}

/// Serialize a [`ResultSet`] and [`persist`] it
///
/// # Errors
///
/// Same as [`persist`].
pub fn persist_results(results: &ResultSet, path: &Path) -> Result<()> {
    let serialized = serde_json::to_vec(results)?;
    persist(&serialized, path)
}

/// Read a results file written by [`persist_results`]
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read and
/// [`Error::Serialization`](crate::Error::Serialization) if it is not a JSON
/// array.
pub fn load_results(path: &Path) -> Result<ResultSet> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}
