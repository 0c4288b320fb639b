use crate::{HotspotName, MaterialName};
use itertools::Itertools;

/// Per-hotspot data quality problems. None of them aborts a run; the hotspot
/// is excluded from every ranking pass and reported instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("incomplete data for hotspot '{hotspot}': no price for {}", format_materials(.missing))]
    IncompleteHotspotData { hotspot: HotspotName, missing: Vec<MaterialName> },

    #[error("degenerate volatility for hotspot '{hotspot}': the highest material price is zero")]
    DegenerateVolatility { hotspot: HotspotName },

    #[error("hotspot '{hotspot}' has an empty drop table")]
    EmptyDropTable { hotspot: HotspotName },

    #[error("metrics of hotspot '{hotspot}' are not finite numbers")]
    NonFiniteMetrics { hotspot: HotspotName },
}

impl ValuationError {
    pub fn hotspot(&self) -> &HotspotName {
        match self {
            ValuationError::IncompleteHotspotData { hotspot, .. } => hotspot,
            ValuationError::DegenerateVolatility { hotspot } => hotspot,
            ValuationError::EmptyDropTable { hotspot } => hotspot,
            ValuationError::NonFiniteMetrics { hotspot } => hotspot,
        }
    }

    pub fn short_reason(&self) -> String {
        match self {
            ValuationError::IncompleteHotspotData { missing, .. } => format!("missing price: {}", format_materials(missing)),
            ValuationError::DegenerateVolatility { .. } => "all material prices are zero".to_string(),
            ValuationError::EmptyDropTable { .. } => "empty drop table".to_string(),
            ValuationError::NonFiniteMetrics { .. } => "metrics out of numeric range".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CostModelError {
    #[error("charges per enabler item must be positive, got {0}")]
    NonPositiveCharges(f64),

    #[error("transport cost parameter '{name}' must be a finite non-negative number, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("transport cost model needs a price for '{0}', but none was resolved")]
    UnresolvedPrice(MaterialName),
}

fn format_materials(materials: &[MaterialName]) -> String {
    materials.iter().map(|m| format!("'{m}'")).join(", ")
}
