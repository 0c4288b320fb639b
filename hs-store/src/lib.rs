pub mod atomic_file;
pub mod csv_export;
pub mod errors;
pub mod hotspot_catalog;
pub mod material_catalog;
pub mod snapshot;

pub use errors::CatalogError;
pub use hotspot_catalog::{load_hotspot_catalog, load_hotspot_snapshot, HotspotSource};
pub use material_catalog::load_material_catalog;
pub use snapshot::{merge_snapshot, write_snapshot};

use serde::de::DeserializeOwned;
use std::path::Path;

/// Strict JSON decoding that reports where in the document a value failed to parse.
pub(crate) fn parse_json_catalog<T: DeserializeOwned>(content: &str, path: &Path) -> Result<T, CatalogError> {
    let deserializer = &mut serde_json::Deserializer::from_str(content);

    let value: T = serde_path_to_error::deserialize(&mut *deserializer).map_err(|err| {
        let location = err.path().to_string();
        let inner = err.into_inner();
        if location.is_empty() || location == "." {
            CatalogError::malformed(path, inner.to_string())
        } else {
            CatalogError::malformed(path, format!("{inner} (at '{location}')"))
        }
    })?;

    deserializer
        .end()
        .map_err(|err| CatalogError::malformed(path, err.to_string()))?;

    Ok(value)
}
