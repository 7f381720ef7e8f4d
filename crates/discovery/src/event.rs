//! Structured diagnostic events.

use std::sync::Arc;

/// A meaningful state transition in host resolution or request failover.
///
/// Dispatcher events carry the `request_id` of the logical call, so retries of
/// the same call can be correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiscoveryEvent {
	/// A read found no usable snapshot and has to wait for a refresh.
	ResolveMiss {
		/// Service the read was for.
		service: String,
	},
	/// A resolver fetch was started.
	RefreshStarted {
		/// Base path passed to the resolver.
		url: String,
	},
	/// A resolver fetch succeeded and the snapshot was replaced.
	RefreshCompleted {
		/// Number of services in the new snapshot.
		services: usize,
	},
	/// A resolver fetch failed; the previous snapshot was left in place.
	RefreshFailed {
		/// Rendered resolver error.
		error: String,
	},
	/// A request attempt was sent to a host.
	Dispatch {
		/// Logical call identifier.
		request_id: String,
		/// Target service.
		service: String,
		/// Chosen host.
		host: String,
		/// One-based attempt number within the call.
		attempt: usize,
	},
	/// An attempt failed and the call moves on to the next candidate.
	Retry {
		/// Logical call identifier.
		request_id: String,
		/// Target service.
		service: String,
		/// Host that failed.
		host: String,
		/// Rendered transport error.
		error: String,
	},
	/// Every candidate failed; the cache was invalidated and the call re-resolves.
	ForcedInvalidation {
		/// Logical call identifier.
		request_id: String,
		/// Target service.
		service: String,
	},
	/// The call completed with a response.
	CallSucceeded {
		/// Logical call identifier.
		request_id: String,
		/// Target service.
		service: String,
		/// Number of attempts made.
		attempts: usize,
	},
	/// The call failed terminally.
	CallFailed {
		/// Logical call identifier.
		request_id: String,
		/// Target service.
		service: String,
		/// Rendered final error.
		error: String,
	},
}

/// Sink for [`DiscoveryEvent`]s.
///
/// Any `Fn(DiscoveryEvent) + Send + Sync` closure is a sink.
pub trait EventSink: Send + Sync {
	/// Receive one event. Must not block.
	fn emit(&self, event: DiscoveryEvent);
}

impl<F> EventSink for F
where
	F: Fn(DiscoveryEvent) + Send + Sync,
{
	fn emit(&self, event: DiscoveryEvent) {
		self(event)
	}
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
	fn emit(&self, _event: DiscoveryEvent) {}
}

/// Shared event sink handle.
pub type SharedEventSink = Arc<dyn EventSink>;
