//! Failover dispatcher.
//!
//! One call walks this state machine, strictly sequentially:
//!
//! ```text
//! Fresh -> Resolving -> Dispatched -> Succeeded
//!              ^            |
//!              |            +-> Retrying ---------> Dispatched
//!              |            +-> ForceInvalidating -> Resolving
//!              |            +-> Failed
//!              +-- resolution failure -> Failed
//! ```
//!
//! Resolution failures are terminal. A transport failure moves to the next
//! candidate while the retry predicate allows it; once the candidates run out
//! the call may force one cache invalidation and re-resolve before failing.

use std::sync::Arc;

use beacon_discovery::{DiscoveryEvent, HostCache, NoOpEventSink, SharedEventSink};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::handle::ServiceHandle;
use crate::interceptor::SharedInterceptor;
use crate::message::{Request, Response};
use crate::state::DiscoveryState;
use crate::transport::{Transport, TransportError};
use crate::{Error, Result};

/// Decides whether a failed attempt moves on to the next candidate.
pub type RetryPredicate = Arc<dyn Fn(&TransportError) -> bool + Send + Sync>;

/// Produces the identifier that correlates the attempts of one logical call.
pub type RequestIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Client that dispatches calls to discovered hosts with failover.
///
/// Cheap to clone; clones share the cache, transport and interceptors.
#[derive(Clone)]
pub struct FailoverClient {
	inner: Arc<Inner>,
}

struct Inner {
	cache: Arc<HostCache>,
	transport: Arc<dyn Transport>,
	config: ClientConfig,
	need_retry: RetryPredicate,
	request_id: RequestIdGenerator,
	interceptors: Vec<SharedInterceptor>,
	events: SharedEventSink,
}

impl std::fmt::Debug for FailoverClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FailoverClient")
			.field("cache", &self.inner.cache)
			.field("config", &self.inner.config)
			.field("interceptors", &self.inner.interceptors.len())
			.finish_non_exhaustive()
	}
}

impl FailoverClient {
	/// Start building a client over a shared cache and a transport.
	pub fn builder(cache: Arc<HostCache>, transport: Arc<dyn Transport>) -> FailoverClientBuilder {
		FailoverClientBuilder {
			cache,
			transport,
			config: ClientConfig::default(),
			need_retry: Arc::new(|_| true),
			request_id: Arc::new(|| uuid::Uuid::new_v4().to_string()),
			interceptors: Vec::new(),
			events: Arc::new(NoOpEventSink),
		}
	}

	/// Entry point for calls to `service`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidCall`] if `service` is empty.
	pub fn service(&self, service: impl Into<String>) -> Result<ServiceHandle> {
		let service = service.into();
		if service.is_empty() {
			return Err(Error::InvalidCall);
		}
		Ok(ServiceHandle::new(self.clone(), service))
	}

	/// Send `request` to `service`, failing over across its candidate hosts.
	///
	/// # Errors
	///
	/// - [`Error::InvalidCall`] if `service` is empty.
	/// - [`Error::Discovery`] if the hosts could not be resolved.
	/// - [`Error::Transport`] carrying the last attempt's failure.
	/// - Whatever an interceptor returns.
	pub async fn call(&self, service: &str, request: Request) -> Result<Response> {
		self.inner.call(service, request).await
	}

	/// Ceiling on candidate hosts per call, shared with the cache.
	pub fn retries(&self) -> usize {
		self.inner.cache.config().candidate_limit()
	}

	/// The shared host cache.
	pub fn cache(&self) -> &Arc<HostCache> {
		&self.inner.cache
	}

	/// The client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}
}

impl Inner {
	async fn call(&self, service: &str, request: Request) -> Result<Response> {
		if service.is_empty() {
			return Err(Error::InvalidCall);
		}
		let request_id = (self.request_id)();

		let outcome = match self.intercept_request(request).await {
			Ok(request) => self.dispatch(service, request, &request_id).await,
			Err(e) => {
				self.failed(service, &request_id, &e);
				Err(e)
			}
		};

		self.intercept_response(outcome).await
	}

	async fn intercept_request(&self, mut request: Request) -> Result<Request> {
		for interceptor in &self.interceptors {
			request = interceptor.on_request(request).await?;
		}
		Ok(request)
	}

	async fn intercept_response(&self, mut outcome: Result<Response>) -> Result<Response> {
		for interceptor in &self.interceptors {
			outcome = interceptor.on_response(outcome).await;
		}
		outcome
	}

	async fn dispatch(&self, service: &str, mut request: Request, request_id: &str) -> Result<Response> {
		// Fresh: caller-supplied discovery state is never trusted.
		request.discovery = None;
		let mut forced_invalidation = false;
		let mut attempt = 0usize;

		loop {
			// Resolving
			if request.discovery.is_none() {
				let hosts = match self.cache.hosts_for(service).await {
					Ok(hosts) => hosts,
					Err(e) => {
						let e = Error::from(e);
						self.failed(service, request_id, &e);
						return Err(e);
					}
				};
				request.discovery = Some(DiscoveryState::new(
					request.path.clone(),
					hosts,
					forced_invalidation,
				));
			}

			// Dispatched
			let Some((host, target)) = request.discovery.as_mut().and_then(|state| {
				let host = state.next_host()?;
				let target = state.target_for(&host);
				Some((host, target))
			}) else {
				// The cache never hands out an empty candidate list.
				let e = Error::Discovery(beacon_discovery::Error::ServiceUnavailable(service.to_string()));
				self.failed(service, request_id, &e);
				return Err(e);
			};

			request.path = target;
			attempt += 1;
			debug!(request_id, service, host = %host, attempt, "Dispatching request");
			self.events.emit(DiscoveryEvent::Dispatch {
				request_id: request_id.to_string(),
				service: service.to_string(),
				host: host.to_string(),
				attempt,
			});

			let err = match self.transport.send(request).await {
				Ok(response) => {
					debug!(request_id, service, attempt, status = response.status, "Request succeeded");
					self.events.emit(DiscoveryEvent::CallSucceeded {
						request_id: request_id.to_string(),
						service: service.to_string(),
						attempts: attempt,
					});
					return Ok(response);
				}
				Err(err) => err,
			};

			if !(self.need_retry)(&err) {
				let e = Error::Transport(err);
				self.failed(service, request_id, &e);
				return Err(e);
			}

			let Some(state) = err.request.discovery.as_ref() else {
				warn!(request_id, service, "Transport dropped discovery state; giving up");
				let e = Error::Transport(err);
				self.failed(service, request_id, &e);
				return Err(e);
			};
			let original_path = state.original_path().to_string();

			if !state.is_exhausted() {
				// Retrying
				info!(request_id, service, host = %host, error = %err, "Attempt failed, trying next host");
				self.events.emit(DiscoveryEvent::Retry {
					request_id: request_id.to_string(),
					service: service.to_string(),
					host: host.to_string(),
					error: err.to_string(),
				});
				request = *err.request;
				request.path = original_path;
				self.pause().await;
				continue;
			}

			if self.config.update_hosts_after_fail_request && !state.forced_invalidation() {
				// ForceInvalidating
				warn!(request_id, service, error = %err, "All candidates failed, re-resolving hosts");
				self.cache.force_invalidate();
				self.events.emit(DiscoveryEvent::ForcedInvalidation {
					request_id: request_id.to_string(),
					service: service.to_string(),
				});
				forced_invalidation = true;
				request = *err.request;
				request.path = original_path;
				request.discovery = None;
				self.pause().await;
				continue;
			}

			let e = Error::Transport(err);
			self.failed(service, request_id, &e);
			return Err(e);
		}
	}

	async fn pause(&self) {
		let delay = self.config.retry_delay();
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
	}

	fn failed(&self, service: &str, request_id: &str, error: &Error) {
		warn!(request_id, service, error = %error, "Request failed");
		self.events.emit(DiscoveryEvent::CallFailed {
			request_id: request_id.to_string(),
			service: service.to_string(),
			error: error.to_string(),
		});
	}
}

/// Builder for [`FailoverClient`].
pub struct FailoverClientBuilder {
	cache: Arc<HostCache>,
	transport: Arc<dyn Transport>,
	config: ClientConfig,
	need_retry: RetryPredicate,
	request_id: RequestIdGenerator,
	interceptors: Vec<SharedInterceptor>,
	events: SharedEventSink,
}

impl FailoverClientBuilder {
	/// Set the client configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Set the retry predicate. Defaults to retrying every failure.
	pub fn need_retry(mut self, predicate: impl Fn(&TransportError) -> bool + Send + Sync + 'static) -> Self {
		self.need_retry = Arc::new(predicate);
		self
	}

	/// Set the request id generator. Defaults to random UUIDs.
	pub fn request_id(mut self, generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
		self.request_id = Arc::new(generator);
		self
	}

	/// Append an interceptor. Interceptors run in registration order.
	pub fn interceptor(mut self, interceptor: SharedInterceptor) -> Self {
		self.interceptors.push(interceptor);
		self
	}

	/// Set the diagnostic event sink.
	pub fn event_sink(mut self, events: SharedEventSink) -> Self {
		self.events = events;
		self
	}

	/// Build the client.
	pub fn build(self) -> FailoverClient {
		FailoverClient {
			inner: Arc::new(Inner {
				cache: self.cache,
				transport: self.transport,
				config: self.config,
				need_retry: self.need_retry,
				request_id: self.request_id,
				interceptors: self.interceptors,
				events: self.events,
			}),
		}
	}
}
