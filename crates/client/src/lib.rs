//! Failover request dispatch over discovered hosts.
//!
//! A [`FailoverClient`] turns "call service X" into a sequence of attempts
//! against the candidate hosts a [`HostCache`](beacon_discovery::HostCache)
//! hands out. Attempts are strictly sequential: the call consumes one host per
//! attempt, retries on failure while the retry predicate allows it, and can
//! force the cache to re-resolve once when every candidate failed.
//!
//! The wire is abstracted by the [`Transport`] trait; caller-side request and
//! response transforms plug in as ordered [`Interceptor`]s around the
//! dispatcher. Interceptors see each call exactly once, never its internal
//! retries.
//!
//! ```ignore
//! use beacon_client::{ClientConfig, FailoverClient, Request};
//!
//! let client = FailoverClient::builder(cache, transport)
//!     .config(ClientConfig::default().update_hosts_after_fail_request(true))
//!     .interceptor(Arc::new(AcceptJson))
//!     .build();
//!
//! let billing = client.service("billing")?;
//! let response = billing.call(Request::get("/invoices/42")).await?;
//! ```
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod handle;
mod interceptor;
mod message;
mod resolver;
mod state;
mod transport;

pub use beacon_discovery;
pub use config::ClientConfig;
pub use dispatcher::{FailoverClient, FailoverClientBuilder, RequestIdGenerator, RetryPredicate};
pub use handle::{ResponseFuture, ServiceHandle};
pub use interceptor::{Interceptor, SharedInterceptor};
pub use message::{Method, Request, Response};
pub use resolver::{HttpResolver, TableDecoder};
pub use state::DiscoveryState;
pub use transport::{StatusClass, Transport, TransportError};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A call was made without a service name.
	#[error("call made without a service name")]
	InvalidCall,
	/// Host resolution failed; never retried by the dispatcher.
	#[error(transparent)]
	Discovery(#[from] beacon_discovery::Error),
	/// The last dispatched attempt failed.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// An interceptor refused the call.
	#[error("rejected by interceptor: {0}")]
	Rejected(String),
	/// A response body could not be decoded.
	#[error("decode failed: {0}")]
	Decode(#[from] serde_json::Error),
	/// A configuration document could not be parsed.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	/// The transport failure behind this error, if any.
	pub fn transport(&self) -> Option<&TransportError> {
		match self {
			Self::Transport(err) => Some(err),
			_ => None,
		}
	}
}
