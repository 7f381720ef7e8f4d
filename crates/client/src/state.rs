//! Per-call discovery state.

use std::collections::VecDeque;

use beacon_discovery::Host;

/// Discovery state attached to one outgoing call.
///
/// Created when the call first resolves its candidates, consumed one host per
/// attempt, and discarded when the call resolves or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryState {
	original_path: String,
	remaining: VecDeque<Host>,
	forced_invalidation: bool,
}

impl DiscoveryState {
	pub(crate) fn new(
		original_path: impl Into<String>,
		hosts: Vec<Host>,
		forced_invalidation: bool,
	) -> Self {
		Self {
			original_path: original_path.into(),
			remaining: hosts.into(),
			forced_invalidation,
		}
	}

	/// Path the caller asked for, before any host was prepended.
	pub fn original_path(&self) -> &str {
		&self.original_path
	}

	/// Candidates not yet attempted, in order.
	pub fn remaining(&self) -> impl ExactSizeIterator<Item = &Host> {
		self.remaining.iter()
	}

	/// Returns true if no untried candidate is left.
	pub fn is_exhausted(&self) -> bool {
		self.remaining.is_empty()
	}

	/// Whether this call already forced a cache invalidation.
	pub fn forced_invalidation(&self) -> bool {
		self.forced_invalidation
	}

	/// Consume the next candidate.
	pub(crate) fn next_host(&mut self) -> Option<Host> {
		self.remaining.pop_front()
	}

	/// Absolute target for `host`.
	pub(crate) fn target_for(&self, host: &Host) -> String {
		format!("{host}{}", self.original_path)
	}
}
