//! Configuration for the failover dispatcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for a [`crate::FailoverClient`].
///
/// The per-call candidate ceiling (`retries`) is not repeated here: it belongs
/// to the [`beacon_discovery::DiscoveryConfig`] of the shared cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Force-invalidate the cache and re-resolve once when every candidate of a
	/// call failed.
	#[serde(default)]
	pub update_hosts_after_fail_request: bool,
	/// Pause between consecutive attempts of one call, in milliseconds.
	#[serde(default)]
	pub retry_delay_ms: u64,
}

impl ClientConfig {
	/// Parse a configuration from a TOML document.
	///
	/// Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
	}

	/// Enable or disable forced re-resolution after a fully failed candidate list.
	pub fn update_hosts_after_fail_request(mut self, enabled: bool) -> Self {
		self.update_hosts_after_fail_request = enabled;
		self
	}

	/// Set the pause between attempts in milliseconds.
	pub fn retry_delay_ms(mut self, delay_ms: u64) -> Self {
		self.retry_delay_ms = delay_ms;
		self
	}

	/// Pause between attempts.
	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}
