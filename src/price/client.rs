//!
//! HTTP client for the fiat price service.
//!
//! The service is expected to answer a plain GET with a JSON object carrying a unix `time` and a
//! `USD` field, the shape served by mempool-style `/api/v1/prices` endpoints.

use super::types::Price;
use crate::error::PriceError;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Source of the current BTC/USD price.
#[async_trait::async_trait]
pub trait PriceClient: Send + Sync {
	async fn fetch_price(&self) -> Result<Price, PriceError>;
}

/// Price client backed by an HTTP endpoint
#[derive(Clone)]
pub struct HttpPriceClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Full URL of the prices endpoint.
	url: String,
}

impl HttpPriceClient {
	/// Create a new price client.
	///
	/// # Arguments
	/// * `url` - The prices endpoint.
	/// * `timeout` - Per-request timeout.
	pub fn new(url: String, timeout: Duration) -> Result<Self, PriceError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self { http_client, url })
	}
}

#[async_trait::async_trait]
impl PriceClient for HttpPriceClient {
	async fn fetch_price(&self) -> Result<Price, PriceError> {
		debug!("Fetching price from {}", self.url);

		let response = self.http_client.get(&self.url).send().await?;

		if !response.status().is_success() {
			return Err(PriceError::Status(response.status()));
		}

		let body = response.text().await?;
		let price: Price = serde_json::from_str(&body)?;

		debug!("Fetched price: {} USD at {}", price.usd, price.time);
		Ok(price)
	}
}
