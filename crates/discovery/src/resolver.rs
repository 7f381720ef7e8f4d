//! Resolver port: the external source of service tables.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::table::ServiceTable;

/// Source of the current service table.
///
/// Implementations talk to whatever registry holds the topology and map its
/// payload into a [`ServiceTable`]. Pagination, protocol and payload shape are
/// entirely the adapter's concern.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
	/// Fetch the full service table.
	///
	/// `url` is the base path configured in [`crate::DiscoveryConfig::url`].
	async fn fetch(&self, url: &str) -> anyhow::Result<ServiceTable>;
}

/// Resolver over an in-memory table.
///
/// Useful for bootstrapping a registry client from fixed addresses, and in
/// tests. The table may be swapped at runtime with [`StaticResolver::set`]; the
/// change becomes visible on the next cache refresh.
#[derive(Debug, Default)]
pub struct StaticResolver {
	table: RwLock<ServiceTable>,
}

impl StaticResolver {
	/// Create a resolver serving `table`.
	pub fn new(table: ServiceTable) -> Self {
		Self {
			table: RwLock::new(table),
		}
	}

	/// Replace the served table.
	pub fn set(&self, table: ServiceTable) {
		*self.table.write() = table;
	}
}

#[async_trait]
impl Resolver for StaticResolver {
	async fn fetch(&self, _url: &str) -> anyhow::Result<ServiceTable> {
		Ok(self.table.read().clone())
	}
}
