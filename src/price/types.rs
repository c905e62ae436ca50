//! Types returned by the price service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bitcoin price in USD as reported by the price service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// USD per BTC
    #[serde(rename = "USD")]
    pub usd: f64,
    /// Unix timestamp (seconds) at which the service sampled the price
    pub time: i64,
}

impl Price {
    /// Sample time as a UTC timestamp, if it is representable.
    pub fn sampled_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// USD value of `sats` at `usd_per_btc`.
pub fn sats_to_usd(sats: u64, usd_per_btc: f64) -> f64 {
    sats as f64 / 100_000_000.0 * usd_per_btc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_mempool_style_response() {
        let body = r#"{"time":1703252411,"USD":43940,"EUR":40240,"GBP":34715}"#;
        let price: Price = serde_json::from_str(body).unwrap();
        assert_eq!(price.usd, 43940.0);
        assert_eq!(price.time, 1703252411);
        assert_eq!(
            price.sampled_at().unwrap().to_rfc3339(),
            "2023-12-22T13:40:11+00:00"
        );
    }

    #[test]
    fn converts_sats_to_usd() {
        assert_eq!(sats_to_usd(100_000_000, 50_000.0), 50_000.0);
        assert!((sats_to_usd(50_000, 40_000.0) - 20.0).abs() < 1e-9);
        assert_eq!(sats_to_usd(0, 40_000.0), 0.0);
    }
}
