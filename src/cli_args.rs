use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hs_core::{RunConfiguration, TransportCostSettings, DEFAULT_PRICE_API_BASE_URL};
use hs_domain::ValuationConfig;
use hs_store::HotspotSource;
use std::path::PathBuf;
use std::time::Duration;

/// Ranks archaeology excavation hotspots by current market prices
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory for daily rolling JSON log files. Console logging only if unset.
    #[arg(long, global = true, env("HS_LOG_DIR"))]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// fetches prices, values every hotspot, prints the leaderboard and rewrites the hotspot catalog
    Run(RunArgs),
    /// writes the hotspot catalog as CSV
    ExportCsv(ExportCsvArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HotspotSourceArg {
    Json,
    Csv,
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    #[arg(long, env("HS_MATERIALS_PATH"), default_value = "data/materials.json")]
    pub materials_path: PathBuf,

    /// Hotspot catalog. The updated snapshot is always written here.
    #[arg(long, env("HS_HOTSPOTS_PATH"), default_value = "data/hotspots.json")]
    pub hotspots_path: PathBuf,

    #[arg(long, env("HS_HOTSPOTS_SOURCE"), value_enum, default_value_t = HotspotSourceArg::Json)]
    pub hotspots_source: HotspotSourceArg,

    #[arg(long, env("HS_HOTSPOTS_CSV_PATH"), default_value = "data/hotspots.csv")]
    pub hotspots_csv_path: PathBuf,

    #[arg(long, env("HS_PRICE_API_BASE_URL"), default_value = DEFAULT_PRICE_API_BASE_URL)]
    pub price_api_base_url: String,

    #[arg(long, env("HS_USER_AGENT"), default_value = "rs3-arch-excavation-pricechecker")]
    pub user_agent: String,

    #[arg(long, env("HS_REQUEST_TIMEOUT_SECS"), default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Material whose price is the energy price of the transport cost model
    #[arg(long, env("HS_TRANSPORT_ENERGY_MATERIAL"))]
    pub transport_energy_material: Option<String>,

    /// Material whose price is the enabler item price of the transport cost model
    #[arg(long, env("HS_TRANSPORT_ENABLER_MATERIAL"))]
    pub transport_enabler_material: Option<String>,

    #[arg(long, env("HS_TRANSPORT_ENERGY_PER_CHARGE"))]
    pub transport_energy_per_charge: Option<f64>,

    #[arg(long, env("HS_TRANSPORT_CHARGES_PER_ENABLER"))]
    pub transport_charges_per_enabler: Option<f64>,

    /// e.g. 0.9 for an equipment bonus
    #[arg(long, env("HS_TRANSPORT_EFFICIENCY_MULTIPLIER"), default_value_t = 1.0)]
    pub transport_efficiency_multiplier: f64,
}

#[derive(Clone, Debug, Args)]
pub struct ExportCsvArgs {
    #[arg(long, env("HS_HOTSPOTS_PATH"), default_value = "data/hotspots.json")]
    pub hotspots_path: PathBuf,

    #[arg(long, env("HS_CSV_EXPORT_PATH"), default_value = "scripts/hotspots.csv")]
    pub output_path: PathBuf,
}

impl RunArgs {
    pub fn to_configuration(&self) -> Result<RunConfiguration> {
        let transport_cost = TransportCostSettings {
            energy_material: self.transport_energy_material.clone(),
            enabler_material: self.transport_enabler_material.clone(),
            energy_per_charge: self.transport_energy_per_charge,
            charges_per_enabler_item: self.transport_charges_per_enabler,
            efficiency_multiplier: self.transport_efficiency_multiplier,
        }
        .resolve()
        .context("Invalid transport cost configuration")?;

        let hotspot_source = match self.hotspots_source {
            HotspotSourceArg::Json => HotspotSource::Json(self.hotspots_path.clone()),
            HotspotSourceArg::Csv => HotspotSource::Csv(self.hotspots_csv_path.clone()),
        };

        Ok(RunConfiguration {
            materials_path: self.materials_path.clone(),
            hotspot_source,
            snapshot_path: self.hotspots_path.clone(),
            price_api_base_url: self.price_api_base_url.clone(),
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            valuation: ValuationConfig::default(),
            transport_cost,
        })
    }
}
