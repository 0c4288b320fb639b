use crate::errors::CatalogError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn tmp_path_for(target: &Path) -> PathBuf {
    let mut file_name = target.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    file_name.push(".tmp");
    target.with_file_name(file_name)
}

fn write_synced(path: &Path, payload: &[u8]) -> Result<(), CatalogError> {
    let mut file = File::create(path).map_err(|e| CatalogError::io(path, e))?;
    file.write_all(payload).map_err(|e| CatalogError::io(path, e))?;
    file.sync_all().map_err(|e| CatalogError::io(path, e))
}

/// Writes `payload` next to `target`, syncs it and renames it over `target`.
/// On any failure the previous file is untouched and no tmp file is left behind.
pub fn write_atomic(target: &Path, payload: &[u8]) -> Result<(), CatalogError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let tmp = tmp_path_for(target);

    let result = write_synced(&tmp, payload).and_then(|()| fs::rename(&tmp, target).map_err(|e| CatalogError::io(target, e)));
    if result.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
