use crate::errors::CatalogError;
use crate::parse_json_catalog;
use hs_domain::{DropTableEntry, Hotspot, HotspotCatalog, HotspotName, HotspotSnapshot, MaterialName};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

/// Where hotspot definitions are read from. The snapshot is always written as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotspotSource {
    Json(PathBuf),
    Csv(PathBuf),
}

impl HotspotSource {
    pub fn path(&self) -> &Path {
        match self {
            HotspotSource::Json(path) => path,
            HotspotSource::Csv(path) => path,
        }
    }
}

pub fn load_hotspot_catalog(source: &HotspotSource) -> Result<HotspotCatalog, CatalogError> {
    let catalog = match source {
        HotspotSource::Json(path) => load_hotspot_snapshot(path)?.definitions(),
        HotspotSource::Csv(path) => {
            let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
            parse_hotspots_csv(&content, path)?
        }
    };

    event!(
        Level::DEBUG,
        "Loaded {} hotspots from {}",
        catalog.len(),
        source.path().display()
    );

    Ok(catalog)
}

/// Reads the JSON hotspot catalog including the derived fields of the previous run.
pub fn load_hotspot_snapshot(path: &Path) -> Result<HotspotSnapshot, CatalogError> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    parse_hotspot_snapshot(&content, path)
}

pub fn parse_hotspot_snapshot(content: &str, path: &Path) -> Result<HotspotSnapshot, CatalogError> {
    let snapshot: HotspotSnapshot = parse_json_catalog(content, path)?;

    for (name, record) in snapshot.iter() {
        record
            .hotspot
            .validate()
            .map_err(|e| CatalogError::malformed(path, format!("hotspot '{name}': {e}")))?;
    }

    Ok(snapshot)
}

/// One hotspot per line: `name,level,materials`. `materials` is the rest of the line and holds
/// `;`-separated `material:chance` pairs. An optional `name,...` header, blank lines and
/// `#` comments are skipped.
pub fn parse_hotspots_csv(content: &str, path: &Path) -> Result<HotspotCatalog, CatalogError> {
    let mut catalog = HotspotCatalog::new();
    let mut first_record = true;

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = |reason: String| CatalogError::malformed(path, format!("line {line_number}: {reason}"));

        let mut columns = line.splitn(3, ',').map(str::trim);
        let name = columns.next().unwrap_or_default();

        if first_record {
            first_record = false;
            if name.eq_ignore_ascii_case("name") {
                continue;
            }
        }

        let (Some(level), Some(materials)) = (columns.next(), columns.next()) else {
            return Err(malformed("expected 'name,level,materials'".to_string()));
        };
        if name.is_empty() {
            return Err(malformed("empty hotspot name".to_string()));
        }

        let level: u32 = level
            .parse()
            .map_err(|_| malformed(format!("level '{level}' is not a positive integer")))?;

        let hotspot = Hotspot {
            level,
            materials: parse_drop_table(materials).map_err(&malformed)?,
        };
        hotspot
            .validate()
            .map_err(|e| malformed(format!("hotspot '{name}': {e}")))?;

        catalog
            .push(HotspotName(name.to_string()), hotspot)
            .map_err(|e| malformed(e.to_string()))?;
    }

    Ok(catalog)
}

fn parse_drop_table(materials: &str) -> Result<Vec<DropTableEntry>, String> {
    materials
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, chance) = pair
                .rsplit_once(':')
                .ok_or_else(|| format!("drop table entry '{pair}' is not 'material:chance'"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("drop table entry '{pair}' has no material name"));
            }
            let chance: f64 = chance
                .trim()
                .parse()
                .map_err(|_| format!("drop chance '{}' of '{name}' is not a number", chance.trim()))?;

            Ok(DropTableEntry {
                name: MaterialName(name.to_string()),
                percentage_chance: chance,
            })
        })
        .collect()
}
