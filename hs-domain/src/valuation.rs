use crate::errors::{CostModelError, ValuationError};
use crate::{DropTableEntry, Hotspot, HotspotCatalog, HotspotMetrics, HotspotName, MaterialName, PriceTable};
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// Steepness of the AFK curve. Empirical game balance tuning; must stay bit-identical
/// so scores remain comparable with snapshots written by earlier versions.
pub const AFK_CURVE_STEEPNESS: f64 = 0.0115524530093324;

/// Level at which the inverse exponential scale crosses zero.
pub const AFK_REFERENCE_LEVEL: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationConfig {
    pub afk_curve_steepness: f64,
    pub afk_reference_level: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            afk_curve_steepness: AFK_CURVE_STEEPNESS,
            afk_reference_level: AFK_REFERENCE_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// A hotspot that was valued successfully, tagged with its catalog name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedHotspot {
    pub name: HotspotName,
    pub hotspot: Hotspot,
    pub metrics: HotspotMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedHotspot {
    pub name: HotspotName,
    pub hotspot: Hotspot,
    pub error: ValuationError,
}

/// Outcome of valuing a whole catalog. Both lists keep catalog order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Valuation {
    pub computed: Vec<ComputedHotspot>,
    pub excluded: Vec<ExcludedHotspot>,
}

impl Valuation {
    pub fn metrics_for(&self, name: &HotspotName) -> Option<&HotspotMetrics> {
        self.computed
            .iter()
            .find_map(|computed| (&computed.name == name).then_some(&computed.metrics))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    cfg: ValuationConfig,
}

impl ValuationEngine {
    pub fn new(cfg: ValuationConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.cfg
    }

    /// `1 - exp(b * (level - L0))`, exactly zero at the reference level.
    pub fn inverse_exponential_scale(&self, level: u32) -> f64 {
        1.0 - (self.cfg.afk_curve_steepness * (level as f64 - self.cfg.afk_reference_level)).exp()
    }

    /// Monotonically increasing in `level`. Equals `exp(b * (level - L0))`, but is evaluated
    /// through the inverse scale so results match historical snapshots bit for bit.
    pub fn compute_afk_factor(&self, level: u32) -> f64 {
        1.0 - self.inverse_exponential_scale(level)
    }

    pub fn evaluate(
        &self,
        name: &HotspotName,
        hotspot: &Hotspot,
        prices: &PriceTable,
        fixed_cost_per_action: f64,
        computed_at: DateTime<Utc>,
    ) -> Result<HotspotMetrics, ValuationError> {
        if hotspot.materials.is_empty() {
            return Err(ValuationError::EmptyDropTable { hotspot: name.clone() });
        }

        let (Some(PriceRange { min, max }), Some(avg_price)) = (
            compute_range(&hotspot.materials, prices),
            compute_weighted_average_price(&hotspot.materials, prices),
        ) else {
            return Err(ValuationError::IncompleteHotspotData {
                hotspot: name.clone(),
                missing: missing_materials(&hotspot.materials, prices),
            });
        };

        let afk_factor = self.compute_afk_factor(hotspot.level);
        let price_volatility =
            compute_volatility(min, max).ok_or_else(|| ValuationError::DegenerateVolatility { hotspot: name.clone() })?;
        let score = compute_score(afk_factor, avg_price, price_volatility, fixed_cost_per_action);

        if ![afk_factor, avg_price, score].iter().all(|value| value.is_finite()) {
            return Err(ValuationError::NonFiniteMetrics { hotspot: name.clone() });
        }

        Ok(HotspotMetrics {
            afk_factor,
            avg_price,
            score,
            min_price: min,
            max_price: max,
            price_volatility,
            last_updated: computed_at,
        })
    }

    /// Values every hotspot of the catalog. Failures are collected per hotspot, never propagated.
    pub fn evaluate_all(
        &self,
        catalog: &HotspotCatalog,
        prices: &PriceTable,
        fixed_cost_per_action: f64,
        computed_at: DateTime<Utc>,
    ) -> Valuation {
        let (computed, excluded): (Vec<_>, Vec<_>) = catalog
            .iter()
            .map(|(name, hotspot)| match self.evaluate(name, hotspot, prices, fixed_cost_per_action, computed_at) {
                Ok(metrics) => Ok(ComputedHotspot {
                    name: name.clone(),
                    hotspot: hotspot.clone(),
                    metrics,
                }),
                Err(error) => Err(ExcludedHotspot {
                    name: name.clone(),
                    hotspot: hotspot.clone(),
                    error,
                }),
            })
            .partition_result();

        Valuation { computed, excluded }
    }
}

pub fn missing_materials(drop_table: &[DropTableEntry], prices: &PriceTable) -> Vec<MaterialName> {
    drop_table
        .iter()
        .filter(|entry| prices.price_of(&entry.name).is_none())
        .map(|entry| entry.name.clone())
        .unique()
        .collect_vec()
}

/// Sum of `price * chance` over the drop table. Deliberately not normalized by the sum of
/// chances: the result is an expected value per action under the given weights.
/// `None` if a material has no price.
pub fn compute_weighted_average_price(drop_table: &[DropTableEntry], prices: &PriceTable) -> Option<f64> {
    drop_table
        .iter()
        .map(|entry| prices.price_of(&entry.name).map(|price| price * entry.percentage_chance))
        .sum()
}

/// Unweighted min and max price over the drop table. `None` for an empty table or a missing price.
pub fn compute_range(drop_table: &[DropTableEntry], prices: &PriceTable) -> Option<PriceRange> {
    let material_prices: Vec<f64> = drop_table
        .iter()
        .map(|entry| prices.price_of(&entry.name))
        .collect::<Option<_>>()?;

    let min = material_prices.iter().copied().reduce(f64::min)?;
    let max = material_prices.iter().copied().reduce(f64::max)?;

    Some(PriceRange { min, max })
}

/// `(max - min) / max`. `None` when `max` is zero, since the spread is undefined.
pub fn compute_volatility(min: f64, max: f64) -> Option<f64> {
    if max <= 0.0 || !max.is_finite() {
        return None;
    }
    Some((max - min) / max)
}

pub fn compute_score(afk_factor: f64, avg_price: f64, price_volatility: f64, fixed_cost_per_action: f64) -> f64 {
    afk_factor * (avg_price - fixed_cost_per_action) * (1.0 - price_volatility)
}

/// Cost of one charge: `((energy_per_charge * energy_price) + enabler_item_price) / charges_per_enabler_item`,
/// scaled by `efficiency_multiplier`.
pub fn apply_transport_cost_model(
    energy_price: f64,
    enabler_item_price: f64,
    energy_per_charge: f64,
    charges_per_enabler_item: f64,
    efficiency_multiplier: f64,
) -> f64 {
    ((energy_per_charge * energy_price) + enabler_item_price) / charges_per_enabler_item * efficiency_multiplier
}

/// Optional per-action overhead subtracted from the expected value of every hotspot.
/// The energy and the enabler item are regular catalog materials, so their prices come
/// from the same batched quote request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCostModel {
    pub energy_material: MaterialName,
    pub enabler_material: MaterialName,
    pub energy_per_charge: f64,
    pub charges_per_enabler_item: f64,
    pub efficiency_multiplier: f64,
}

impl TransportCostModel {
    pub fn new(
        energy_material: MaterialName,
        enabler_material: MaterialName,
        energy_per_charge: f64,
        charges_per_enabler_item: f64,
        efficiency_multiplier: f64,
    ) -> Result<Self, CostModelError> {
        if !(charges_per_enabler_item > 0.0) || !charges_per_enabler_item.is_finite() {
            return Err(CostModelError::NonPositiveCharges(charges_per_enabler_item));
        }
        for (name, value) in [
            ("energy_per_charge", energy_per_charge),
            ("efficiency_multiplier", efficiency_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CostModelError::InvalidParameter { name, value });
            }
        }

        Ok(Self {
            energy_material,
            enabler_material,
            energy_per_charge,
            charges_per_enabler_item,
            efficiency_multiplier,
        })
    }

    pub fn cost_per_action(&self, prices: &PriceTable) -> Result<f64, CostModelError> {
        let energy_price = prices
            .price_of(&self.energy_material)
            .ok_or_else(|| CostModelError::UnresolvedPrice(self.energy_material.clone()))?;
        let enabler_item_price = prices
            .price_of(&self.enabler_material)
            .ok_or_else(|| CostModelError::UnresolvedPrice(self.enabler_material.clone()))?;

        Ok(apply_transport_cost_model(
            energy_price,
            enabler_item_price,
            self.energy_per_charge,
            self.charges_per_enabler_item,
            self.efficiency_multiplier,
        ))
    }
}
