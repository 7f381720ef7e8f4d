//! TTL host cache.
//!
//! Holds one [`ServiceTable`] snapshot and its fetch instant. Readers that find
//! the snapshot missing, expired or invalidated elect a single refresh leader;
//! everyone else waits on the leader's outcome.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::event::{DiscoveryEvent, NoOpEventSink, SharedEventSink};
use crate::resolver::Resolver;
use crate::table::{Host, ServiceTable};
use crate::{Error, Result};

/// The live resolved table.
struct Snapshot {
	table: ServiceTable,
	fetched_at: Instant,
	invalidated: bool,
}

impl Snapshot {
	fn new(table: ServiceTable) -> Self {
		Self {
			table,
			fetched_at: Instant::now(),
			invalidated: false,
		}
	}

	fn is_usable(&self, config: &DiscoveryConfig) -> bool {
		!self.invalidated && self.fetched_at.elapsed() < config.ttl()
	}
}

/// `None` until the leader publishes.
type RefreshOutcome = Option<Result<()>>;

/// Tracking state for a refresh in progress.
struct InFlightRefresh {
	tx: watch::Sender<RefreshOutcome>,
	rx: watch::Receiver<RefreshOutcome>,
}

impl InFlightRefresh {
	fn new() -> Self {
		let (tx, rx) = watch::channel(None);
		Self { tx, rx }
	}
}

/// Snapshot and in-flight marker under a single lock.
///
/// The lock is never held across an await point. Freshness check, leader
/// election, snapshot replacement and per-service rotation all happen inside
/// one critical section each, so no two readers can elect two leaders or
/// rotate the same list independently.
struct CacheState {
	snapshot: Option<Snapshot>,
	inflight: Option<Arc<InFlightRefresh>>,
}

impl CacheState {
	/// Bounded prefix of the service's list, then rotate the list by one.
	fn take_candidates(&mut self, service: &str, limit: usize) -> Result<Vec<Host>> {
		let hosts = self
			.snapshot
			.as_mut()
			.and_then(|snapshot| snapshot.table.get_mut(service))
			.filter(|hosts| !hosts.is_empty())
			.ok_or_else(|| Error::ServiceUnavailable(service.to_string()))?;

		let candidates = hosts.iter().take(limit).cloned().collect();
		hosts.rotate_left(1);
		Ok(candidates)
	}
}

enum Role {
	Leader(Arc<InFlightRefresh>),
	Waiter(watch::Receiver<RefreshOutcome>),
}

/// Time-to-live cache of resolved service hosts.
///
/// Thread-safe; share it across tasks via `Arc<HostCache>`.
///
/// # Refresh protocol
///
/// 1. Fast path: a usable snapshot is read and rotated under the lock.
/// 2. Leader election: the first reader to see an unusable snapshot installs the
///    in-flight marker and fetches; later readers clone its outcome receiver.
/// 3. The leader replaces the snapshot (success only), clears the marker and
///    publishes the outcome to every waiter.
/// 4. All participants then read from whatever snapshot is live.
///
/// A failed fetch is never cached: the previous snapshot (if any) stays in place
/// and still counts as unusable, so the next read fetches again.
pub struct HostCache {
	config: DiscoveryConfig,
	resolver: Arc<dyn Resolver>,
	events: SharedEventSink,
	state: Mutex<CacheState>,
}

impl std::fmt::Debug for HostCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("HostCache")
			.field("config", &self.config)
			.field("has_snapshot", &state.snapshot.is_some())
			.field("refreshing", &state.inflight.is_some())
			.finish_non_exhaustive()
	}
}

impl HostCache {
	/// Start building a cache with the given configuration.
	pub fn builder(config: DiscoveryConfig) -> HostCacheBuilder {
		HostCacheBuilder {
			config,
			resolver: None,
			events: Arc::new(NoOpEventSink),
		}
	}

	/// Create a cache over `resolver` with no event sink.
	pub fn new(config: DiscoveryConfig, resolver: Arc<dyn Resolver>) -> Self {
		Self::from_parts(config, resolver, Arc::new(NoOpEventSink))
	}

	fn from_parts(
		config: DiscoveryConfig,
		resolver: Arc<dyn Resolver>,
		events: SharedEventSink,
	) -> Self {
		Self {
			config,
			resolver,
			events,
			state: Mutex::new(CacheState {
				snapshot: None,
				inflight: None,
			}),
		}
	}

	/// The cache configuration.
	pub fn config(&self) -> &DiscoveryConfig {
		&self.config
	}

	/// Returns true if a snapshot exists that is neither expired nor invalidated.
	pub fn is_fresh(&self) -> bool {
		self.state
			.lock()
			.snapshot
			.as_ref()
			.is_some_and(|snapshot| snapshot.is_usable(&self.config))
	}

	/// Candidate hosts for `service`.
	///
	/// Returns the first `min(retries, len)` hosts of the service's list, in
	/// order, and rotates that list by one so the next read starts at the next
	/// host. Refreshes the snapshot first if it is missing, expired or
	/// invalidated.
	///
	/// # Errors
	///
	/// - [`Error::MissingServiceName`] if `service` is empty.
	/// - [`Error::ResolutionFailed`] if the refresh this read depended on failed.
	/// - [`Error::ServiceUnavailable`] if the snapshot has no hosts for `service`.
	pub async fn hosts_for(&self, service: &str) -> Result<Vec<Host>> {
		if service.is_empty() {
			return Err(Error::MissingServiceName);
		}
		let limit = self.config.candidate_limit();

		let role = {
			let mut state = self.state.lock();
			if state
				.snapshot
				.as_ref()
				.is_some_and(|snapshot| snapshot.is_usable(&self.config))
			{
				return state.take_candidates(service, limit);
			}

			match &state.inflight {
				Some(inflight) => Role::Waiter(inflight.rx.clone()),
				None => {
					let inflight = Arc::new(InFlightRefresh::new());
					state.inflight = Some(Arc::clone(&inflight));
					Role::Leader(inflight)
				}
			}
		};

		debug!(service = %service, "Service table stale or missing");
		self.events.emit(DiscoveryEvent::ResolveMiss {
			service: service.to_string(),
		});

		match role {
			Role::Leader(inflight) => self.refresh(inflight).await?,
			Role::Waiter(rx) => wait_for_refresh(rx).await?,
		}

		self.state.lock().take_candidates(service, limit)
	}

	/// Mark the current snapshot unusable regardless of its age.
	///
	/// Does not fetch; the next [`HostCache::hosts_for`] does.
	pub fn force_invalidate(&self) {
		if let Some(snapshot) = self.state.lock().snapshot.as_mut() {
			snapshot.invalidated = true;
		}
		info!("Service table invalidated");
	}

	async fn refresh(&self, inflight: Arc<InFlightRefresh>) -> Result<()> {
		let guard = RefreshGuard {
			state: &self.state,
			inflight,
			completed: false,
		};

		info!(url = %self.config.url, "Refreshing service table");
		self.events.emit(DiscoveryEvent::RefreshStarted {
			url: self.config.url.clone(),
		});

		let fetched = self.resolver.fetch(&self.config.url).await;
		let services = fetched.as_ref().map(ServiceTable::len).unwrap_or_default();

		match guard.complete(fetched) {
			Ok(()) => {
				info!(services, "Service table refreshed");
				self.events
					.emit(DiscoveryEvent::RefreshCompleted { services });
				Ok(())
			}
			Err(e) => {
				warn!(error = %e, "Service table refresh failed");
				self.events.emit(DiscoveryEvent::RefreshFailed {
					error: e.to_string(),
				});
				Err(e)
			}
		}
	}
}

/// Wait for the leader of an in-flight refresh to publish its outcome.
async fn wait_for_refresh(mut rx: watch::Receiver<RefreshOutcome>) -> Result<()> {
	loop {
		let outcome = {
			let borrow = rx.borrow_and_update();
			borrow.as_ref().cloned()
		};

		if let Some(outcome) = outcome {
			return outcome;
		}

		if rx.changed().await.is_err() {
			return Err(Error::resolution(anyhow::anyhow!(
				"refresh leader dropped without a result"
			)));
		}
	}
}

/// Builder for [`HostCache`].
pub struct HostCacheBuilder {
	config: DiscoveryConfig,
	resolver: Option<Arc<dyn Resolver>>,
	events: SharedEventSink,
}

impl HostCacheBuilder {
	/// Set the resolver. Required.
	pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
		self.resolver = Some(resolver);
		self
	}

	/// Set the diagnostic event sink.
	pub fn event_sink(mut self, events: SharedEventSink) -> Self {
		self.events = events;
		self
	}

	/// Build the cache.
	///
	/// # Errors
	///
	/// Returns [`Error::ResolverNotConfigured`] if no resolver was set.
	pub fn build(self) -> Result<HostCache> {
		let resolver = self.resolver.ok_or(Error::ResolverNotConfigured)?;
		Ok(HostCache::from_parts(self.config, resolver, self.events))
	}
}

/// Guard that clears the in-flight marker on drop if the leader is cancelled
/// before publishing, so waiters never hang and the next read can retry.
struct RefreshGuard<'a> {
	state: &'a Mutex<CacheState>,
	inflight: Arc<InFlightRefresh>,
	completed: bool,
}

impl RefreshGuard<'_> {
	fn complete(mut self, fetched: anyhow::Result<ServiceTable>) -> Result<()> {
		self.completed = true;

		let outcome = {
			let mut state = self.state.lock();
			self.clear_marker(&mut state);
			match fetched {
				Ok(table) => {
					state.snapshot = Some(Snapshot::new(table));
					Ok(())
				}
				Err(e) => Err(Error::resolution(e)),
			}
		};

		// The marker holds its own receiver, so this cannot fail.
		let _ = self.inflight.tx.send(Some(outcome.clone()));
		outcome
	}

	fn clear_marker(&self, state: &mut CacheState) {
		if state
			.inflight
			.as_ref()
			.is_some_and(|current| Arc::ptr_eq(current, &self.inflight))
		{
			state.inflight = None;
		}
	}
}

impl Drop for RefreshGuard<'_> {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		{
			let mut state = self.state.lock();
			self.clear_marker(&mut state);
		}

		let _ = self
			.inflight
			.tx
			.send(Some(Err(Error::resolution(anyhow::anyhow!(
				"refresh aborted (leader cancelled)"
			)))));
	}
}

#[cfg(test)]
mod tests;
