//! Configuration for the host cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for a [`crate::HostCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
	/// Base path handed to the resolver on every fetch.
	#[serde(default = "default_url")]
	pub url: String,
	/// Snapshot lifetime in milliseconds.
	#[serde(default = "default_ttl_ms")]
	pub ttl_ms: u64,
	/// Ceiling on candidate hosts handed to a single call.
	#[serde(default = "default_retries")]
	pub retries: usize,
}

/// Returns the default resolver base path.
fn default_url() -> String {
	"/".to_string()
}

/// Returns the default snapshot lifetime in milliseconds.
fn default_ttl_ms() -> u64 {
	60_000
}

/// Returns the default candidate ceiling.
fn default_retries() -> usize {
	3
}

impl Default for DiscoveryConfig {
	fn default() -> Self {
		Self {
			url: default_url(),
			ttl_ms: default_ttl_ms(),
			retries: default_retries(),
		}
	}
}

impl DiscoveryConfig {
	/// Parse a configuration from a TOML document.
	///
	/// Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
	}

	/// Set the resolver base path.
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	/// Set the snapshot lifetime in milliseconds.
	pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
		self.ttl_ms = ttl_ms;
		self
	}

	/// Set the candidate ceiling per call.
	pub fn retries(mut self, retries: usize) -> Self {
		self.retries = retries;
		self
	}

	/// Snapshot lifetime.
	pub fn ttl(&self) -> Duration {
		Duration::from_millis(self.ttl_ms)
	}

	/// Candidate ceiling, never below one.
	pub fn candidate_limit(&self) -> usize {
		self.retries.max(1)
	}
}
