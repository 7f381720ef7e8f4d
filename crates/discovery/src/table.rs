//! Resolved service table types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of a single endpoint, as understood by the transport (usually
/// scheme plus authority, e.g. `http://10.0.0.7:8080`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
	/// Create a host from its address.
	pub fn new(address: impl Into<String>) -> Self {
		Self(address.into())
	}

	/// The host address.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Host {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Host {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Host {
	fn from(address: &str) -> Self {
		Self::new(address)
	}
}

impl From<String> for Host {
	fn from(address: String) -> Self {
		Self(address)
	}
}

/// Mapping from service name to its ordered host list.
///
/// Order within a host list is significant: it is the rotation order used by
/// [`crate::HostCache`]. Deserializes from a plain map, e.g.
/// `{"billing": ["http://a:80", "http://b:80"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceTable {
	services: HashMap<String, Vec<Host>>,
}

impl ServiceTable {
	/// Create an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the host list for a service, replacing any previous entry.
	pub fn insert(
		&mut self,
		service: impl Into<String>,
		hosts: impl IntoIterator<Item = impl Into<Host>>,
	) {
		self.services
			.insert(service.into(), hosts.into_iter().map(Into::into).collect());
	}

	/// Host list for a service, in rotation order.
	pub fn get(&self, service: &str) -> Option<&[Host]> {
		self.services.get(service).map(Vec::as_slice)
	}

	/// Mutable host list for a service.
	pub(crate) fn get_mut(&mut self, service: &str) -> Option<&mut Vec<Host>> {
		self.services.get_mut(service)
	}

	/// Number of services in the table.
	pub fn len(&self) -> usize {
		self.services.len()
	}

	/// Returns true if the table has no services.
	pub fn is_empty(&self) -> bool {
		self.services.is_empty()
	}

	/// Names of all services in the table, in no particular order.
	pub fn service_names(&self) -> impl Iterator<Item = &str> {
		self.services.keys().map(String::as_str)
	}
}

impl<S, I> FromIterator<(S, I)> for ServiceTable
where
	S: Into<String>,
	I: IntoIterator,
	I::Item: Into<Host>,
{
	fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
		let mut table = Self::new();
		for (service, hosts) in iter {
			table.insert(service, hosts);
		}
		table
	}
}
