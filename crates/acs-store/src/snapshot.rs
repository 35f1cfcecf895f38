//! JSON snapshot files
//!
//! Every file-backed store keeps its whole content in memory and rewrites a
//! pretty-printed snapshot after each mutation. Writes go to a temporary file
//! in the same directory, which is then renamed over the target.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Load a snapshot, or the default value when the file does not exist
pub(crate) fn load<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(StoreError::io(path, err)),
    }
}

/// Atomically replace the snapshot at `path`
pub(crate) fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;

    let bytes = serde_json::to_vec_pretty(value)?;
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|err| StoreError::io(dir, err))?;
    file.write_all(&bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|err| StoreError::io(file.path(), err))?;
    file.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;

    tracing::trace!(path = %path.display(), bytes = bytes.len(), "snapshot written");
    Ok(())
}
