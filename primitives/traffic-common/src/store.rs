//! JSON files holding the recorded table of each repository.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::table::TrafficTable;

/// Location of the table for `org/repo` inside `dir`.
pub fn table_path(dir: &Path, org: &str, repo: &str) -> PathBuf {
    dir.join(format!("{org}__{repo}.json"))
}

/// Reads a stored table. A missing file means nothing was recorded yet.
pub fn load_table(path: &Path) -> Result<Option<TrafficTable>, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let table = serde_json::from_slice(&data).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(table))
}

/// Writes `table` to `path`, replacing any previous file in one rename.
pub fn save_table(path: &Path, table: &TrafficTable) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let data = serde_json::to_vec_pretty(table).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    tracing::debug!(path = %path.display(), rows = table.len(), "saved traffic table");
    Ok(())
}
