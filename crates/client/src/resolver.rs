//! Resolver that fetches the service table through the failover client itself.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use beacon_discovery::{Resolver, ServiceTable};
use tracing::debug;

use crate::handle::ServiceHandle;
use crate::message::{Request, Response};

/// Maps a registry response into a [`ServiceTable`].
pub type TableDecoder = Arc<dyn Fn(&Response) -> anyhow::Result<ServiceTable> + Send + Sync>;

/// [`Resolver`] that asks a registry service for the table.
///
/// The registry is reached through a [`ServiceHandle`], so its own hosts are
/// discovered and failed over like any other service. The usual setup backs
/// that handle with a cache over a
/// [`StaticResolver`](beacon_discovery::StaticResolver) listing the registry's
/// bootstrap addresses.
#[derive(Clone)]
pub struct HttpResolver {
	registry: ServiceHandle,
	decode: TableDecoder,
}

impl std::fmt::Debug for HttpResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpResolver")
			.field("registry", &self.registry.name())
			.finish_non_exhaustive()
	}
}

impl HttpResolver {
	/// Resolver whose registry answers with a JSON-encoded [`ServiceTable`].
	pub fn new(registry: ServiceHandle) -> Self {
		Self::with_decoder(registry, |response: &Response| {
			response
				.json::<ServiceTable>()
				.context("registry response is not a service table")
		})
	}

	/// Resolver with a custom payload mapping.
	pub fn with_decoder(
		registry: ServiceHandle,
		decode: impl Fn(&Response) -> anyhow::Result<ServiceTable> + Send + Sync + 'static,
	) -> Self {
		Self {
			registry,
			decode: Arc::new(decode),
		}
	}
}

#[async_trait]
impl Resolver for HttpResolver {
	async fn fetch(&self, url: &str) -> anyhow::Result<ServiceTable> {
		let response = self
			.registry
			.call(Request::get(url).header("Accept", "application/json"))
			.await
			.with_context(|| format!("registry {} unreachable", self.registry.name()))?;

		if !response.is_success() {
			anyhow::bail!(
				"registry {} answered with status {}",
				self.registry.name(),
				response.status
			);
		}

		let table = (self.decode)(&response)?;
		debug!(registry = self.registry.name(), services = table.len(), "Fetched service table");
		Ok(table)
	}
}
