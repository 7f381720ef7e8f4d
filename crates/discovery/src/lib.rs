//! Client-side service discovery: turns a logical service name into a ranked,
//! rotating list of hosts.
//!
//! The crate is centered on [`HostCache`], a time-to-live cache over a single
//! [`ServiceTable`] snapshot fetched from a pluggable [`Resolver`]. The cache
//! guarantees that at most one fetch is outstanding at a time: every reader that
//! observes a stale or missing snapshot joins the same in-flight refresh.
//!
//! Each successful read of a name rotates that name's host list by one position,
//! so consecutive calls spread over all known hosts without forcing a network
//! refresh. A caller that has exhausted every host it was handed can escape the
//! TTL window early with [`HostCache::force_invalidate`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use beacon_discovery::{DiscoveryConfig, HostCache, ServiceTable, StaticResolver};
//!
//! let table: ServiceTable = [("billing", vec!["http://10.0.0.1:8080", "http://10.0.0.2:8080"])]
//!     .into_iter()
//!     .collect();
//! let cache = HostCache::builder(DiscoveryConfig::default().ttl_ms(10_000))
//!     .resolver(Arc::new(StaticResolver::new(table)))
//!     .build()?;
//!
//! let candidates = cache.hosts_for("billing").await?;
//! ```
#![warn(missing_docs)]

use std::sync::Arc;

mod cache;
mod config;
mod event;
mod resolver;
mod table;

pub use cache::{HostCache, HostCacheBuilder};
pub use config::DiscoveryConfig;
pub use event::{DiscoveryEvent, EventSink, NoOpEventSink, SharedEventSink};
pub use resolver::{Resolver, StaticResolver};
pub use table::{Host, ServiceTable};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
///
/// Errors are cheap to clone: a single refresh outcome is delivered to every
/// caller that waited on it.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A [`HostCache`] was built without a resolver.
	#[error("no resolver configured")]
	ResolverNotConfigured,
	/// Hosts were requested for an empty service name.
	#[error("service name is empty")]
	MissingServiceName,
	/// The resolved snapshot has no hosts for the requested service.
	#[error("service unavailable: {0}")]
	ServiceUnavailable(String),
	/// The resolver failed to produce a snapshot.
	#[error("host resolution failed: {0}")]
	ResolutionFailed(Arc<anyhow::Error>),
	/// A configuration document could not be parsed.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	pub(crate) fn resolution(err: anyhow::Error) -> Self {
		Self::ResolutionFailed(Arc::new(err))
	}
}
