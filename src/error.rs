//! Failure taxonomy for wallet synchronization.
//!
//! Every failure the wallet engine, the price service or the orchestrator itself can produce is
//! expressed as one of the enums below, and every one of them converts into [`AppError`], the single
//! shape handed to the presentation layer.

use std::time::Duration;

/// Which orchestration path produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
	/// Re-scan of already derived scripts.
	Incremental,
	/// Outward derivation until the gap limit is reached.
	FullScan,
	/// One pass of the event-driven node sync.
	NodeSync,
}

impl std::fmt::Display for SyncMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SyncMode::Incremental => write!(f, "incremental sync"),
			SyncMode::FullScan => write!(f, "full scan"),
			SyncMode::NodeSync => write!(f, "node sync"),
		}
	}
}

/// Errors raised at the wallet engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
	#[error("Cannot connect to chain data source: {0}")]
	CannotConnect(String),

	#[error("Chain data source error: {0}")]
	ChainSource(String),

	#[error("Request builder error: {0}")]
	RequestBuilder(String),

	#[error("Persistence error: {0}")]
	Persistence(String),

	#[error("Wallet error: {0}")]
	Wallet(String),

	#[error("Sync did not complete within {0:?}")]
	Timeout(Duration),

	#[error("Unexpected error: {0}")]
	Other(String),
}

/// Whether a failure kind is one the given sync path expects to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
	Recognized,
	Residual,
}

impl EngineError {
	/// Classify this error relative to the path that raised it.
	pub fn classify(&self, mode: SyncMode) -> FailureClass {
		let recognized = match mode {
			SyncMode::Incremental => matches!(
				self,
				EngineError::CannotConnect(_)
					| EngineError::ChainSource(_)
					| EngineError::RequestBuilder(_)
					| EngineError::Persistence(_)
			),
			SyncMode::FullScan => matches!(
				self,
				EngineError::CannotConnect(_)
					| EngineError::ChainSource(_)
					| EngineError::Persistence(_)
			),
			SyncMode::NodeSync => !matches!(self, EngineError::Other(_)),
		};

		if recognized {
			FailureClass::Recognized
		} else {
			FailureClass::Residual
		}
	}
}

/// Errors raised while fetching the fiat price.
#[derive(Debug, thiserror::Error)]
pub enum PriceError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Price service returned status {0}")]
	Status(reqwest::StatusCode),

	#[error("Malformed price response: {0}")]
	Json(#[from] serde_json::Error),
}

/// Errors raised while loading [`crate::config::SyncConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {value}")]
	InvalidValue { key: &'static str, value: String },
}

/// The single user-facing error shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
	pub message: String,
}

impl AppError {
	pub fn generic(message: impl Into<String>) -> Self {
		let message = message.into();
		if message.is_empty() {
			return Self {
				message: "An unknown error occurred".to_string(),
			};
		}
		Self { message }
	}
}

impl From<&EngineError> for AppError {
	fn from(error: &EngineError) -> Self {
		AppError::generic(error.to_string())
	}
}

impl From<EngineError> for AppError {
	fn from(error: EngineError) -> Self {
		AppError::from(&error)
	}
}

impl From<PriceError> for AppError {
	fn from(error: PriceError) -> Self {
		AppError::generic(error.to_string())
	}
}

impl From<tokio::task::JoinError> for AppError {
	fn from(error: tokio::task::JoinError) -> Self {
		AppError::generic(format!("Continuous sync task failed: {}", error))
	}
}
