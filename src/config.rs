//! Runtime configuration for the sync orchestrator and its collaborators.

use crate::error::ConfigError;
use std::time::Duration;

/// Configuration for wallet synchronization
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Upper bound for one wallet-client sync, full scan or node pass. `None` disables the bound.
	pub sync_timeout: Option<Duration>,
	/// Endpoint of the fiat price service
	pub price_url: String,
	/// Timeout for price requests
	pub http_timeout: Duration,
	/// How many transactions the recent list shows
	pub recent_transactions_limit: usize,
	/// How many broadcast notices the node handler retains
	pub broadcast_history_limit: usize,
	/// First delay before retrying a failed continuous pass
	pub retry_initial_interval: Duration,
	/// Cap on the delay between continuous retries
	pub retry_max_interval: Duration,
	/// Give up retrying after this long. `None` retries until cancelled.
	pub retry_max_elapsed: Option<Duration>,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			sync_timeout: Some(Duration::from_secs(600)),
			price_url: "https://mempool.space/api/v1/prices".to_string(),
			http_timeout: Duration::from_secs(30),
			recent_transactions_limit: 5,
			broadcast_history_limit: 50,
			retry_initial_interval: Duration::from_millis(500),
			retry_max_interval: Duration::from_secs(60),
			retry_max_elapsed: None,
		}
	}
}

impl SyncConfig {
	/// Build a config from the process environment, falling back to defaults for unset keys.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Build a config from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(secs) = parse_u64(&lookup, "WALLET_SYNC_TIMEOUT_SECS")? {
			config.sync_timeout = (secs > 0).then(|| Duration::from_secs(secs));
		}
		if let Some(url) = lookup("WALLET_SYNC_PRICE_URL") {
			if url.trim().is_empty() {
				return Err(ConfigError::InvalidValue {
					key: "WALLET_SYNC_PRICE_URL",
					value: url,
				});
			}
			config.price_url = url;
		}
		if let Some(secs) = parse_u64(&lookup, "WALLET_SYNC_HTTP_TIMEOUT_SECS")? {
			config.http_timeout = Duration::from_secs(secs);
		}
		if let Some(limit) = parse_u64(&lookup, "WALLET_SYNC_RECENT_TXS")? {
			config.recent_transactions_limit = limit as usize;
		}
		if let Some(limit) = parse_u64(&lookup, "WALLET_SYNC_BROADCAST_HISTORY")? {
			config.broadcast_history_limit = limit as usize;
		}
		if let Some(ms) = parse_u64(&lookup, "WALLET_SYNC_RETRY_INITIAL_MS")? {
			config.retry_initial_interval = Duration::from_millis(ms);
		}
		if let Some(ms) = parse_u64(&lookup, "WALLET_SYNC_RETRY_MAX_MS")? {
			config.retry_max_interval = Duration::from_millis(ms);
		}
		if let Some(secs) = parse_u64(&lookup, "WALLET_SYNC_RETRY_MAX_ELAPSED_SECS")? {
			config.retry_max_elapsed = (secs > 0).then(|| Duration::from_secs(secs));
		}

		Ok(config)
	}
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	match lookup(key) {
		None => Ok(None),
		Some(value) => value
			.trim()
			.parse::<u64>()
			.map(Some)
			.map_err(|_| ConfigError::InvalidValue { key, value }),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn empty_environment_yields_defaults() {
		let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
		assert_eq!(config.sync_timeout, Some(Duration::from_secs(600)));
		assert_eq!(config.recent_transactions_limit, 5);
		assert!(config.retry_max_elapsed.is_none());
	}

	#[test]
	fn zero_timeout_disables_bound() {
		let config =
			SyncConfig::from_lookup(lookup_from(&[("WALLET_SYNC_TIMEOUT_SECS", "0")])).unwrap();
		assert!(config.sync_timeout.is_none());
	}

	#[test]
	fn overrides_are_applied() {
		let config = SyncConfig::from_lookup(lookup_from(&[
			("WALLET_SYNC_PRICE_URL", "http://localhost:8080/prices"),
			("WALLET_SYNC_RECENT_TXS", "10"),
			("WALLET_SYNC_BROADCAST_HISTORY", "7"),
			("WALLET_SYNC_RETRY_INITIAL_MS", "20"),
			("WALLET_SYNC_RETRY_MAX_ELAPSED_SECS", "90"),
		]))
		.unwrap();
		assert_eq!(config.price_url, "http://localhost:8080/prices");
		assert_eq!(config.recent_transactions_limit, 10);
		assert_eq!(config.broadcast_history_limit, 7);
		assert_eq!(config.retry_initial_interval, Duration::from_millis(20));
		assert_eq!(config.retry_max_elapsed, Some(Duration::from_secs(90)));
	}

	#[test]
	fn garbage_value_is_rejected() {
		let err = SyncConfig::from_lookup(lookup_from(&[("WALLET_SYNC_TIMEOUT_SECS", "soon")]))
			.unwrap_err();
		assert!(err.to_string().contains("WALLET_SYNC_TIMEOUT_SECS"));
	}
}
