use anyhow::{Context, Result};
use http::Extensions;
use log::{debug, error};
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Client, Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use std::time::{Duration, Instant};

/// No retry and no rate limiting: the price service is hit once per run and a failure aborts the run.
pub fn create_client(user_agent: &str, request_timeout: Duration) -> Result<ClientWithMiddleware> {
    let reqwest_client = Client::builder()
        .timeout(request_timeout)
        .build()
        .context("Failed to build http client")?;

    let client = ClientBuilder::new(reqwest_client)
        .with(UserAgentMiddleware::new(user_agent)?)
        .with(ErrorLoggingMiddleware)
        .build();

    Ok(client)
}

pub struct UserAgentMiddleware {
    user_agent: HeaderValue,
}

impl UserAgentMiddleware {
    pub fn new(user_agent: &str) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .with_context(|| format!("'{user_agent}' is not a valid User-Agent header value"))?;
        Ok(Self { user_agent })
    }
}

#[async_trait::async_trait]
impl Middleware for UserAgentMiddleware {
    async fn handle(&self, mut req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        req.headers_mut().insert(USER_AGENT, self.user_agent.clone());

        next.run(req, extensions).await
    }
}

pub struct ErrorLoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for ErrorLoggingMiddleware {
    async fn handle(&self, req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        let start = Instant::now();
        let method = req.method().clone();
        let url = req.url().clone();

        let result = next.run(req, extensions).await;

        let duration = start.elapsed();

        match &result {
            Ok(resp) if !resp.status().is_success() => {
                error!(
                    "Request failed: {} {} - Status: {}, Duration: {:?}",
                    method,
                    url,
                    resp.status(),
                    duration
                );
            }
            Err(e) => {
                error!("Request error: {} {} - Error: {}, Duration: {:?}", method, url, e, duration);
            }
            _ => {
                debug!("Request succeeded: {} {} - Duration: {:?}", method, url, duration);
            }
        }

        result
    }
}
