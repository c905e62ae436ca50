//! Fiat price lookup for displaying the wallet balance in USD.

/// HTTP client for the price service
mod client;
/// Price values
mod types;

pub use client::{HttpPriceClient, PriceClient};
pub use types::*;
