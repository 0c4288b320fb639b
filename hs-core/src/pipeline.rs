use crate::configuration::RunConfiguration;
use crate::price_client::PriceQuoteClientTrait;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hs_domain::{HotspotCatalog, HotspotSnapshot, Leaderboard, MaterialCatalog, PriceTable, Valuation, ValuationEngine};
use hs_store::{load_hotspot_catalog, load_material_catalog, merge_snapshot, write_snapshot};
use tracing::{event, Level};

/// Everything a run produced, before anything is written to disk.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub computed_at: DateTime<Utc>,
    pub prices: PriceTable,
    pub transport_cost_per_action: Option<f64>,
    pub valuation: Valuation,
    pub leaderboard: Leaderboard,
    pub snapshot: HotspotSnapshot,
}

pub fn load_catalogs(cfg: &RunConfiguration) -> Result<(MaterialCatalog, HotspotCatalog)> {
    let materials = load_material_catalog(&cfg.materials_path).context("Failed to load the material catalog")?;
    let hotspots = load_hotspot_catalog(&cfg.hotspot_source).context("Failed to load the hotspot catalog")?;

    event!(
        Level::INFO,
        "Loaded {} materials and {} hotspots",
        materials.len(),
        hotspots.len()
    );
    Ok((materials, hotspots))
}

pub async fn fetch_price_table(materials: &MaterialCatalog, client: &dyn PriceQuoteClientTrait) -> Result<PriceTable> {
    let quotes = client
        .fetch_prices(&materials.market_ids())
        .await
        .context("Failed to fetch prices")?;

    let join = materials.join_quotes(&quotes);

    for id in join.unresolved_quote_ids.iter() {
        event!(Level::WARN, "Received a quote for market id {} which is not in the material catalog, dropping it", id);
    }
    for (material, price) in join.rejected_quotes.iter() {
        event!(Level::WARN, "Ignoring invalid price {} for material '{}'", price, material);
    }
    for (name, material) in materials.iter() {
        if join.prices.get(name).is_none() {
            event!(Level::WARN, "No price resolved for material '{}' (market id {})", name, material.id);
        }
    }

    Ok(join.prices)
}

/// Catalogs are loaded before any network I/O, so a malformed file fails without a request.
/// Nothing is written here; see [`persist`].
pub async fn run(cfg: &RunConfiguration, client: &dyn PriceQuoteClientTrait, computed_at: DateTime<Utc>) -> Result<RunResult> {
    let (materials, hotspots) = load_catalogs(cfg)?;
    let prices = fetch_price_table(&materials, client).await?;

    let transport_cost_per_action = cfg
        .transport_cost
        .as_ref()
        .map(|model| model.cost_per_action(&prices))
        .transpose()
        .context("Failed to compute the transport cost per action")?;
    if let Some(cost) = transport_cost_per_action {
        event!(Level::INFO, "Transport cost per action: {:.2}", cost);
    }

    let engine = ValuationEngine::new(cfg.valuation);
    let valuation = engine.evaluate_all(&hotspots, &prices, transport_cost_per_action.unwrap_or(0.0), computed_at);

    for excluded in valuation.excluded.iter() {
        event!(Level::WARN, "Excluding hotspot '{}' from ranking: {}", excluded.name, excluded.error);
    }
    event!(
        Level::INFO,
        "Valued {} hotspots, excluded {}",
        valuation.computed.len(),
        valuation.excluded.len()
    );

    let leaderboard = Leaderboard::compute(&valuation.computed);
    let snapshot = merge_snapshot(&hotspots, &valuation);

    Ok(RunResult {
        computed_at,
        prices,
        transport_cost_per_action,
        valuation,
        leaderboard,
        snapshot,
    })
}

pub fn persist(cfg: &RunConfiguration, result: &RunResult) -> Result<()> {
    write_snapshot(&cfg.snapshot_path, &result.snapshot).context("Failed to write the hotspot snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_client::{FetchError, MockPriceQuoteClientTrait, QuoteMap};
    use assert_approx_eq::assert_approx_eq;
    use chrono::TimeZone;
    use hs_domain::{HotspotName, MarketId, MaterialName, PriceQuote, RankingCriterion, TransportCostModel, ValuationConfig, ValuationError};
    use hs_store::HotspotSource;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use test_log::test;

    const MATERIALS: &str = r#"{
  "A": { "id": "1" },
  "B": { "id": "2", "price": 5, "timestamp": "2020-01-01T00:00:00Z" },
  "Energy": { "id": "3" },
  "Enabler": { "id": "4" }
}"#;

    const HOTSPOTS: &str = r#"{
  "Reference": {
    "level": 120,
    "materials": [
      { "name": "A", "percentageChance": 0.5 },
      { "name": "B", "percentageChance": 0.5 }
    ]
  },
  "Beginner": {
    "level": 1,
    "materials": [
      { "name": "A", "percentageChance": 0.5 },
      { "name": "B", "percentageChance": 0.5 }
    ]
  },
  "Haunted": {
    "level": 60,
    "materials": [
      { "name": "A", "percentageChance": 0.5 },
      { "name": "Ectoplasm", "percentageChance": 0.5 }
    ],
    "afkFactor": 0.9,
    "avgPrice": 999999,
    "score": 999999,
    "minPrice": 1,
    "maxPrice": 1,
    "priceVolatility": 0,
    "lastUpdated": 1600000000000
  }
}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hs-pipeline-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn configuration(dir: &Path) -> RunConfiguration {
        let materials_path = dir.join("materials.json");
        let snapshot_path = dir.join("hotspots.json");
        fs::write(&materials_path, MATERIALS).unwrap();
        fs::write(&snapshot_path, HOTSPOTS).unwrap();

        RunConfiguration {
            materials_path,
            hotspot_source: HotspotSource::Json(snapshot_path.clone()),
            snapshot_path,
            price_api_base_url: "http://localhost".to_string(),
            user_agent: "test".to_string(),
            request_timeout: Duration::from_secs(1),
            valuation: ValuationConfig::default(),
            transport_cost: None,
        }
    }

    fn quotes(entries: &[(&str, f64)]) -> QuoteMap {
        entries
            .iter()
            .map(|(id, price)| {
                (
                    MarketId(id.to_string()),
                    PriceQuote {
                        id: MarketId(id.to_string()),
                        price: *price,
                        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
                    },
                )
            })
            .collect()
    }

    fn mock_client(response: QuoteMap) -> MockPriceQuoteClientTrait {
        let mut client = MockPriceQuoteClientTrait::new();
        client
            .expect_fetch_prices()
            .withf(|ids| ids.iter().map(|id| id.0.as_str()).collect::<Vec<_>>() == vec!["1", "2", "3", "4"])
            .times(1)
            .returning(move |_| Ok(response.clone()));
        client
    }

    fn hotspot(name: &str) -> HotspotName {
        HotspotName(name.to_string())
    }

    #[test(tokio::test)]
    async fn values_ranks_and_persists_the_catalog() {
        let dir = test_dir();
        let cfg = configuration(&dir);
        let client = mock_client(quotes(&[("1", 100.0), ("2", 300.0), ("99", 1.0)]));

        let result = run(&cfg, &client, now()).await.unwrap();

        let reference = result.valuation.metrics_for(&hotspot("Reference")).unwrap();
        assert_eq!(reference.afk_factor, 1.0);
        assert_eq!(reference.avg_price, 200.0);
        assert_approx_eq!(reference.score, 200.0 / 3.0, 1e-9);

        let beginner = result.valuation.metrics_for(&hotspot("Beginner")).unwrap();
        assert_approx_eq!(beginner.score, 16.86, 1e-2);

        assert_eq!(result.valuation.excluded.len(), 1);
        assert_eq!(
            result.valuation.excluded[0].error,
            ValuationError::IncompleteHotspotData {
                hotspot: hotspot("Haunted"),
                missing: vec![MaterialName("Ectoplasm".to_string())],
            }
        );

        for criterion in [RankingCriterion::Overall, RankingCriterion::RawMoney, RankingCriterion::RawMoneyAlternate] {
            let best = result.leaderboard.best_for(criterion).unwrap();
            assert_ne!(best.name, hotspot("Haunted"), "{criterion}");
        }
        assert_eq!(result.leaderboard.best_for(RankingCriterion::Overall).unwrap().name, hotspot("Reference"));
        // equal avg price: the first hotspot in catalog order wins
        assert_eq!(
            result.leaderboard.best_for(RankingCriterion::RawMoneyAlternate).unwrap().name,
            hotspot("Reference")
        );

        persist(&cfg, &result).unwrap();

        let written = hs_store::load_hotspot_snapshot(&cfg.snapshot_path).unwrap();
        assert_eq!(written, result.snapshot);
        assert_eq!(
            written.keys().map(|k| k.0.as_str()).collect::<Vec<_>>(),
            vec!["Reference", "Beginner", "Haunted"]
        );
        assert_eq!(written.get(&hotspot("Haunted")).unwrap().metrics, None);
        assert_eq!(written.get(&hotspot("Reference")).unwrap().metrics.as_ref().unwrap().last_updated, now());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test(tokio::test)]
    async fn stale_catalog_prices_are_never_used() {
        let dir = test_dir();
        let cfg = configuration(&dir);
        // B has a price of 5 in the file but no quote this run
        let client = mock_client(quotes(&[("1", 100.0)]));

        let result = run(&cfg, &client, now()).await.unwrap();

        assert!(result.valuation.computed.is_empty());
        assert_eq!(result.valuation.excluded.len(), 3);
        assert!(result.leaderboard.entries.iter().all(|entry| entry.best.is_none()));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test(tokio::test)]
    async fn upstream_failure_aborts_and_leaves_the_snapshot_untouched() {
        let dir = test_dir();
        let cfg = configuration(&dir);
        let mut client = MockPriceQuoteClientTrait::new();
        client
            .expect_fetch_prices()
            .times(1)
            .returning(|_| Err(FetchError::UpstreamUnavailable("503 Service Unavailable".to_string())));

        let err = run(&cfg, &client, now()).await.unwrap_err();

        assert!(format!("{err:#}").contains("503 Service Unavailable"));
        assert_eq!(fs::read_to_string(&cfg.snapshot_path).unwrap(), HOTSPOTS);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test(tokio::test)]
    async fn malformed_catalog_fails_before_fetching() {
        let dir = test_dir();
        let cfg = configuration(&dir);
        fs::write(&cfg.materials_path, r#"{ "A": { "id": 1 } }"#).unwrap();
        let mut client = MockPriceQuoteClientTrait::new();
        client.expect_fetch_prices().times(0);

        let err = run(&cfg, &client, now()).await.unwrap_err();

        assert!(format!("{err:#}").contains("material catalog"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test(tokio::test)]
    async fn transport_cost_is_subtracted_from_every_score() {
        let dir = test_dir();
        let mut cfg = configuration(&dir);
        cfg.transport_cost = Some(
            TransportCostModel::new(
                MaterialName("Energy".to_string()),
                MaterialName("Enabler".to_string()),
                50.0,
                100.0,
                1.0,
            )
            .unwrap(),
        );
        let client = mock_client(quotes(&[("1", 100.0), ("2", 300.0), ("3", 2.0), ("4", 1000.0)]));

        let result = run(&cfg, &client, now()).await.unwrap();

        assert_approx_eq!(result.transport_cost_per_action.unwrap(), 11.0, 1e-12);
        let reference = result.valuation.metrics_for(&hotspot("Reference")).unwrap();
        assert_approx_eq!(reference.score, 1.0 * (200.0 - 11.0) * (1.0 / 3.0), 1e-9);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test(tokio::test)]
    async fn unresolved_transport_material_is_fatal() {
        let dir = test_dir();
        let mut cfg = configuration(&dir);
        cfg.transport_cost = Some(
            TransportCostModel::new(
                MaterialName("Energy".to_string()),
                MaterialName("Enabler".to_string()),
                50.0,
                100.0,
                1.0,
            )
            .unwrap(),
        );
        let client = mock_client(quotes(&[("1", 100.0), ("2", 300.0)]));

        let err = run(&cfg, &client, now()).await.unwrap_err();

        assert!(format!("{err:#}").contains("Energy"));

        fs::remove_dir_all(dir).unwrap();
    }
}
