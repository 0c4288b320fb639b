use async_trait::async_trait;
use hs_domain::{MarketId, PriceQuote};
use itertools::Itertools;
use mockall::automock;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::{event, Level};

pub const DEFAULT_PRICE_API_BASE_URL: &str = "https://api.weirdgloop.org/exchange/history/rs/latest";

pub type QuoteMap = HashMap<MarketId, PriceQuote>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("price quote service unavailable: {0}")]
    UpstreamUnavailable(String),
}

#[automock]
#[async_trait]
pub trait PriceQuoteClientTrait: Send + Sync + Debug {
    /// One batched request for all `ids`.
    async fn fetch_prices(&self, ids: &[MarketId]) -> Result<QuoteMap, FetchError>;
}

#[derive(Debug, Clone)]
pub struct PriceQuoteClient {
    pub client: ClientWithMiddleware,
    pub base_url: String,
}

impl PriceQuoteClient {
    pub fn new(client: ClientWithMiddleware, base_url: String) -> Self {
        PriceQuoteClient { client, base_url }
    }

    /// `id` is the `|`-joined id list, percent-encoded to `%7C` by the query serializer.
    pub fn query_params(ids: &[MarketId]) -> [(&'static str, String); 2] {
        [
            ("id", ids.iter().map(|id| id.0.as_str()).join("|")),
            ("lang", "en".to_string()),
        ]
    }

    pub fn build_request(&self, ids: &[MarketId]) -> RequestBuilder {
        self.client.get(&self.base_url).query(&Self::query_params(ids))
    }

    async fn make_api_call(request: RequestBuilder) -> Result<QuoteMap, FetchError> {
        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable(format!("Failed to send request: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::UpstreamUnavailable(format!("Failed to get response body: {e}")))?;

        if !status.is_success() {
            return Err(FetchError::UpstreamUnavailable(format!(
                "API request failed. Status: {}, Body: {}",
                status, body
            )));
        }

        decode_quotes(&body)
    }
}

/// The service answers with a mapping from market id to quote.
pub fn decode_quotes(body: &str) -> Result<QuoteMap, FetchError> {
    let raw: HashMap<String, PriceQuote> = serde_json::from_str(body).map_err(|e| {
        FetchError::UpstreamUnavailable(format!(
            "Error decoding response: '{:?}'. Response body was: '{}'",
            e, body
        ))
    })?;

    Ok(raw.into_iter().map(|(id, quote)| (MarketId(id), quote)).collect())
}

#[async_trait]
impl PriceQuoteClientTrait for PriceQuoteClient {
    async fn fetch_prices(&self, ids: &[MarketId]) -> Result<QuoteMap, FetchError> {
        if ids.is_empty() {
            event!(Level::WARN, "No market ids to fetch prices for, skipping the request");
            return Ok(QuoteMap::new());
        }

        event!(Level::INFO, "Fetching prices for {} market ids", ids.len());
        let quotes = Self::make_api_call(self.build_request(ids)).await?;
        event!(Level::INFO, "Received {} price quotes", quotes.len());

        Ok(quotes)
    }
}
