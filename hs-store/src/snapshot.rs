use crate::atomic_file::write_atomic;
use crate::errors::CatalogError;
use hs_domain::{HotspotCatalog, HotspotRecord, HotspotSnapshot, Valuation};
use std::path::Path;
use tracing::{event, Level};

/// Attaches this run's derived fields to the catalog definitions. Hotspots without a
/// valuation are written without derived fields, dropping stale values of earlier runs.
pub fn merge_snapshot(catalog: &HotspotCatalog, valuation: &Valuation) -> HotspotSnapshot {
    catalog.map_values(|name, hotspot| HotspotRecord {
        hotspot: hotspot.clone(),
        metrics: valuation.metrics_for(name).cloned(),
    })
}

pub fn encode_snapshot(snapshot: &HotspotSnapshot, path: &Path) -> Result<Vec<u8>, CatalogError> {
    serde_json::to_vec_pretty(snapshot).map_err(|source| CatalogError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_snapshot(path: &Path, snapshot: &HotspotSnapshot) -> Result<(), CatalogError> {
    let payload = encode_snapshot(snapshot, path)?;
    write_atomic(path, &payload)?;

    event!(
        Level::INFO,
        "Wrote snapshot of {} hotspots to {}",
        snapshot.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot_catalog::{load_hotspot_snapshot, parse_hotspot_snapshot};
    use chrono::{TimeZone, Utc};
    use hs_domain::{HotspotName, MaterialName, OrderedCatalog, PriceTable, ResolvedPrice, ValuationEngine};
    use std::fs;

    const CATALOG: &str = r#"{
  "Kharid-et chapel": {
    "level": 74,
    "materials": [
      { "name": "Samite silk", "percentageChance": 0.5 },
      { "name": "White oak", "percentageChance": 0.5 }
    ],
    "afkFactor": 0.1,
    "avgPrice": 1,
    "score": 1,
    "minPrice": 1,
    "maxPrice": 1,
    "priceVolatility": 0,
    "lastUpdated": 1600000000000
  },
  "Infernal Source": {
    "level": 97,
    "materials": [
      { "name": "Hellfire metal", "percentageChance": 1 }
    ],
    "afkFactor": 0.2,
    "avgPrice": 2,
    "score": 2,
    "minPrice": 2,
    "maxPrice": 2,
    "priceVolatility": 0,
    "lastUpdated": 1600000000000
  }
}"#;

    fn prices() -> PriceTable {
        let quoted_at = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        [("Samite silk", 1523.0), ("White oak", 211.0)]
            .into_iter()
            .map(|(name, price)| (MaterialName(name.to_string()), ResolvedPrice { price, quoted_at }))
            .collect()
    }

    fn test_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("hs-snapshot-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn merge_replaces_derived_fields_and_clears_stale_ones() {
        let path = Path::new("hotspots.json");
        let previous = parse_hotspot_snapshot(CATALOG, path).unwrap();
        let catalog = previous.definitions();
        let computed_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let valuation = ValuationEngine::default().evaluate_all(&catalog, &prices(), 0.0, computed_at);
        let snapshot = merge_snapshot(&catalog, &valuation);

        let chapel = snapshot.get(&HotspotName("Kharid-et chapel".to_string())).unwrap();
        let metrics = chapel.metrics.as_ref().unwrap();
        assert_eq!(metrics.avg_price, 0.5 * 1523.0 + 0.5 * 211.0);
        assert_eq!(metrics.last_updated, computed_at);

        // no price for Hellfire metal: excluded, stale values must not survive
        let infernal = snapshot.get(&HotspotName("Infernal Source".to_string())).unwrap();
        assert_eq!(infernal.metrics, None);
    }

    #[test]
    fn written_snapshot_reads_back_identically() {
        let dir = test_dir();
        let path = dir.join("hotspots.json");
        let catalog = parse_hotspot_snapshot(CATALOG, &path).unwrap().definitions();
        let computed_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let valuation = ValuationEngine::default().evaluate_all(&catalog, &prices(), 0.0, computed_at);
        let snapshot = merge_snapshot(&catalog, &valuation);

        write_snapshot(&path, &snapshot).unwrap();
        let read_back = load_hotspot_snapshot(&path).unwrap();

        assert_eq!(read_back, snapshot);

        // re-serializing what was read yields the same bytes
        let first = fs::read(&path).unwrap();
        write_snapshot(&path, &read_back).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn snapshot_is_pretty_printed_in_catalog_order() {
        let catalog = OrderedCatalog::try_from_entries(vec![(
            HotspotName("Solo".to_string()),
            hs_domain::Hotspot {
                level: 3,
                materials: vec![],
            },
        )])
        .unwrap();

        let payload = encode_snapshot(&merge_snapshot(&catalog, &Valuation::default()), Path::new("x.json")).unwrap();

        assert_eq!(
            String::from_utf8(payload).unwrap(),
            "{\n  \"Solo\": {\n    \"level\": 3,\n    \"materials\": []\n  }\n}"
        );
    }
}
