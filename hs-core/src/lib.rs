pub mod configuration;
pub mod pipeline;
pub mod price_client;
pub mod report;
pub mod reqwest_helpers;

pub use configuration::{RunConfiguration, TransportCostSettings};
pub use pipeline::{persist, run, RunResult};
pub use price_client::{FetchError, PriceQuoteClient, PriceQuoteClientTrait, DEFAULT_PRICE_API_BASE_URL};
pub use report::render_report;
pub use reqwest_helpers::create_client;
