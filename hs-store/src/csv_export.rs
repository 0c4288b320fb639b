use crate::atomic_file::write_atomic;
use crate::errors::CatalogError;
use crate::hotspot_catalog::load_hotspot_snapshot;
use hs_domain::HotspotSnapshot;
use itertools::Itertools;
use std::path::Path;
use tracing::{event, Level};

pub const CSV_HEADER: &str = "Key,level,avgPrice,afkFactor,priceVolatility,score";

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// One line per hotspot in catalog order. Hotspots without derived fields get empty cells.
pub fn render_hotspot_csv(snapshot: &HotspotSnapshot) -> String {
    let rows = snapshot.iter().map(|(name, record)| {
        let derived = match &record.metrics {
            Some(m) => [m.avg_price, m.afk_factor, m.price_volatility, m.score]
                .iter()
                .map(|value| value.to_string())
                .join(","),
            None => ",,,".to_string(),
        };
        format!("{},{},{}", escape_field(&name.0), record.hotspot.level, derived)
    });

    std::iter::once(CSV_HEADER.to_string())
        .chain(rows)
        .map(|line| line + "\n")
        .collect()
}

pub fn export_hotspot_csv(snapshot_path: &Path, output_path: &Path) -> Result<usize, CatalogError> {
    let snapshot = load_hotspot_snapshot(snapshot_path)?;
    let csv = render_hotspot_csv(&snapshot);
    write_atomic(output_path, csv.as_bytes())?;

    event!(
        Level::INFO,
        "Exported {} hotspots from {} to {}",
        snapshot.len(),
        snapshot_path.display(),
        output_path.display()
    );
    Ok(snapshot.len())
}
