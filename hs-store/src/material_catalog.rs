use crate::errors::CatalogError;
use crate::parse_json_catalog;
use hs_domain::MaterialCatalog;
use std::fs;
use std::path::Path;
use tracing::{event, Level};

pub fn load_material_catalog(path: &Path) -> Result<MaterialCatalog, CatalogError> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    let catalog = parse_material_catalog(&content, path)?;

    event!(Level::DEBUG, "Loaded {} materials from {}", catalog.len(), path.display());

    Ok(catalog)
}

pub fn parse_material_catalog(content: &str, path: &Path) -> Result<MaterialCatalog, CatalogError> {
    let catalog: MaterialCatalog = parse_json_catalog(content, path)?;

    if let Some((name, _)) = catalog.iter().find(|(_, material)| material.id.0.trim().is_empty()) {
        return Err(CatalogError::malformed(path, format!("material '{name}' has an empty id")));
    }

    Ok(catalog)
}
