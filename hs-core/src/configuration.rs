use anyhow::{bail, Result};
use hs_domain::{MaterialName, TransportCostModel, ValuationConfig};
use hs_store::HotspotSource;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub materials_path: PathBuf,
    pub hotspot_source: HotspotSource,
    /// Always JSON, even when definitions are read from CSV.
    pub snapshot_path: PathBuf,
    pub price_api_base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub valuation: ValuationConfig,
    pub transport_cost: Option<TransportCostModel>,
}

/// Raw transport-cost parameters as they come from the command line or environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportCostSettings {
    pub energy_material: Option<String>,
    pub enabler_material: Option<String>,
    pub energy_per_charge: Option<f64>,
    pub charges_per_enabler_item: Option<f64>,
    pub efficiency_multiplier: f64,
}

impl TransportCostSettings {
    /// `None` if no parameter is set, an error if only some of them are.
    pub fn resolve(&self) -> Result<Option<TransportCostModel>> {
        match (
            &self.energy_material,
            &self.enabler_material,
            self.energy_per_charge,
            self.charges_per_enabler_item,
        ) {
            (None, None, None, None) => Ok(None),
            (Some(energy), Some(enabler), Some(energy_per_charge), Some(charges_per_enabler_item)) => {
                let model = TransportCostModel::new(
                    MaterialName(energy.clone()),
                    MaterialName(enabler.clone()),
                    energy_per_charge,
                    charges_per_enabler_item,
                    self.efficiency_multiplier,
                )?;
                Ok(Some(model))
            }
            _ => bail!(
                "Incomplete transport cost configuration: energy material, enabler material, \
                 energy per charge and charges per enabler must be given together"
            ),
        }
    }
}
