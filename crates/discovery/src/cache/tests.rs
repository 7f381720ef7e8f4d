use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::*;
use crate::resolver::StaticResolver;

/// Resolver that counts fetches and can hold them open until released.
struct MockResolver {
	table: parking_lot::RwLock<ServiceTable>,
	fetch_count: AtomicUsize,
	fail: AtomicBool,
	hold: AtomicBool,
	started_notify: Notify,
	finish_notify: Notify,
}

impl MockResolver {
	fn new(table: ServiceTable) -> Arc<Self> {
		Arc::new(Self {
			table: parking_lot::RwLock::new(table),
			fetch_count: AtomicUsize::new(0),
			fail: AtomicBool::new(false),
			hold: AtomicBool::new(false),
			started_notify: Notify::new(),
			finish_notify: Notify::new(),
		})
	}

	fn fetches(&self) -> usize {
		self.fetch_count.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Resolver for MockResolver {
	async fn fetch(&self, _url: &str) -> anyhow::Result<ServiceTable> {
		self.fetch_count.fetch_add(1, Ordering::SeqCst);
		if self.hold.load(Ordering::SeqCst) {
			self.started_notify.notify_one();
			self.finish_notify.notified().await;
		}
		if self.fail.load(Ordering::SeqCst) {
			anyhow::bail!("registry unreachable");
		}
		Ok(self.table.read().clone())
	}
}

fn table(hosts: &[&str]) -> ServiceTable {
	[("billing", hosts.to_vec())].into_iter().collect()
}

fn cache_with(resolver: Arc<MockResolver>, config: DiscoveryConfig) -> Arc<HostCache> {
	Arc::new(HostCache::new(config, resolver))
}

fn names(hosts: &[Host]) -> Vec<&str> {
	hosts.iter().map(Host::as_str).collect()
}

#[tokio::test]
async fn test_candidates_bounded_by_retries() {
	let resolver = MockResolver::new(table(&["a", "b", "c", "d"]));
	let cache = cache_with(resolver, DiscoveryConfig::default().retries(2));

	let hosts = cache.hosts_for("billing").await.unwrap();
	assert_eq!(names(&hosts), vec!["a", "b"]);
}

#[tokio::test]
async fn test_candidates_cover_short_list() {
	let resolver = MockResolver::new(table(&["a", "b"]));
	let cache = cache_with(resolver, DiscoveryConfig::default().retries(5));

	let hosts = cache.hosts_for("billing").await.unwrap();
	assert_eq!(names(&hosts), vec!["a", "b"]);
}

#[tokio::test]
async fn test_second_read_starts_at_second_host() {
	let resolver = MockResolver::new(table(&["a", "b"]));
	let cache = cache_with(resolver, DiscoveryConfig::default());

	cache.hosts_for("billing").await.unwrap();
	let hosts = cache.hosts_for("billing").await.unwrap();
	assert_eq!(names(&hosts), vec!["b", "a"]);
}

#[tokio::test]
async fn test_rotation_cycles_without_loss_or_duplication() {
	let resolver = MockResolver::new(table(&["a", "b", "c"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default().retries(1));

	let mut firsts = Vec::new();
	for _ in 0..7 {
		let hosts = cache.hosts_for("billing").await.unwrap();
		firsts.push(hosts[0].as_str().to_string());
	}

	assert_eq!(firsts, vec!["a", "b", "c", "a", "b", "c", "a"]);
	assert_eq!(resolver.fetches(), 1);
}

#[tokio::test]
async fn test_rotation_is_per_service() {
	let resolver = MockResolver::new(
		[("billing", vec!["a", "b"]), ("ledger", vec!["x", "y"])]
			.into_iter()
			.collect(),
	);
	let cache = cache_with(resolver, DiscoveryConfig::default());

	cache.hosts_for("billing").await.unwrap();
	let ledger = cache.hosts_for("ledger").await.unwrap();
	assert_eq!(names(&ledger), vec!["x", "y"]);
}

#[tokio::test]
async fn test_resolver_called_once_within_ttl() {
	let resolver = MockResolver::new(table(&["a"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	cache.hosts_for("billing").await.unwrap();
	cache.hosts_for("billing").await.unwrap();

	assert_eq!(resolver.fetches(), 1);
	assert!(cache.is_fresh());
}

#[tokio::test]
async fn test_resolver_called_again_after_ttl() {
	let resolver = MockResolver::new(table(&["a"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default().ttl_ms(10));

	cache.hosts_for("billing").await.unwrap();
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(!cache.is_fresh());
	cache.hosts_for("billing").await.unwrap();

	assert_eq!(resolver.fetches(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_share_one_fetch() {
	let resolver = MockResolver::new(table(&["a", "b", "c"]));
	resolver.hold.store(true, Ordering::SeqCst);
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	let leader = {
		let cache = cache.clone();
		tokio::spawn(async move { cache.hosts_for("billing").await })
	};

	// Wait for the leader to enter the resolver.
	resolver.started_notify.notified().await;

	let waiters: Vec<_> = (0..8)
		.map(|_| {
			let cache = cache.clone();
			tokio::spawn(async move { cache.hosts_for("billing").await })
		})
		.collect();

	// Give the waiters a moment to join the in-flight refresh.
	tokio::time::sleep(Duration::from_millis(50)).await;
	resolver.finish_notify.notify_one();

	let mut results = vec![leader.await.unwrap().unwrap()];
	for waiter in waiters {
		results.push(waiter.await.unwrap().unwrap());
	}

	assert_eq!(resolver.fetches(), 1);

	// Nine reads rotated a three-host list three full times.
	let mut first_hosts: Vec<String> = results
		.iter()
		.map(|hosts| hosts[0].as_str().to_string())
		.collect();
	first_hosts.sort();
	assert_eq!(first_hosts, vec!["a", "a", "a", "b", "b", "b", "c", "c", "c"]);
}

#[tokio::test]
async fn test_unknown_service_is_unavailable() {
	let resolver = MockResolver::new(table(&["a"]));
	let cache = cache_with(resolver, DiscoveryConfig::default());

	let err = cache.hosts_for("ledger").await.unwrap_err();
	assert!(matches!(err, Error::ServiceUnavailable(name) if name == "ledger"));
}

#[tokio::test]
async fn test_empty_host_list_is_unavailable() {
	let resolver = MockResolver::new(table(&[]));
	let cache = cache_with(resolver, DiscoveryConfig::default());

	let err = cache.hosts_for("billing").await.unwrap_err();
	assert!(matches!(err, Error::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_empty_service_name_is_rejected() {
	let resolver = MockResolver::new(table(&["a"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	let err = cache.hosts_for("").await.unwrap_err();
	assert!(matches!(err, Error::MissingServiceName));
	assert_eq!(resolver.fetches(), 0);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
	let resolver = MockResolver::new(table(&["a"]));
	resolver.fail.store(true, Ordering::SeqCst);
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	let err = cache.hosts_for("billing").await.unwrap_err();
	assert!(matches!(err, Error::ResolutionFailed(_)));
	assert!(err.to_string().contains("registry unreachable"));

	resolver.fail.store(false, Ordering::SeqCst);
	let hosts = cache.hosts_for("billing").await.unwrap();
	assert_eq!(names(&hosts), vec!["a"]);
	assert_eq!(resolver.fetches(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot_stale() {
	let resolver = MockResolver::new(table(&["a"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	cache.hosts_for("billing").await.unwrap();
	cache.force_invalidate();
	resolver.fail.store(true, Ordering::SeqCst);

	assert!(cache.hosts_for("billing").await.is_err());
	assert!(cache.hosts_for("billing").await.is_err());
	assert_eq!(resolver.fetches(), 3);
}

#[tokio::test]
async fn test_force_invalidate_refetches_on_next_read() {
	let resolver = MockResolver::new(table(&["a", "b"]));
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	cache.hosts_for("billing").await.unwrap();
	resolver.table.write().insert("billing", ["c", "d"]);

	cache.force_invalidate();
	assert!(!cache.is_fresh());
	assert_eq!(resolver.fetches(), 1, "invalidation must not fetch by itself");

	let hosts = cache.hosts_for("billing").await.unwrap();
	assert_eq!(names(&hosts), vec!["c", "d"]);
	assert_eq!(resolver.fetches(), 2);
}

#[tokio::test]
async fn test_cancelled_leader_unblocks_waiters() {
	let resolver = MockResolver::new(table(&["a"]));
	resolver.hold.store(true, Ordering::SeqCst);
	let cache = cache_with(resolver.clone(), DiscoveryConfig::default());

	let leader = {
		let cache = cache.clone();
		tokio::spawn(async move { cache.hosts_for("billing").await })
	};
	resolver.started_notify.notified().await;

	let waiter = {
		let cache = cache.clone();
		tokio::spawn(async move { cache.hosts_for("billing").await })
	};
	tokio::time::sleep(Duration::from_millis(20)).await;

	leader.abort();
	let err = waiter.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::ResolutionFailed(_)));

	// The marker was cleared, so a later read leads a fresh fetch.
	resolver.hold.store(false, Ordering::SeqCst);
	assert!(cache.hosts_for("billing").await.is_ok());
	assert_eq!(resolver.fetches(), 2);
}

#[tokio::test]
async fn test_builder_requires_resolver() {
	let err = HostCache::builder(DiscoveryConfig::default())
		.build()
		.unwrap_err();
	assert!(matches!(err, Error::ResolverNotConfigured));
}

#[tokio::test]
async fn test_events_follow_refresh_transitions() {
	let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
	let sink = {
		let events = events.clone();
		move |event: DiscoveryEvent| events.lock().push(event)
	};
	let cache = HostCache::builder(DiscoveryConfig::default().url("apps/"))
		.resolver(Arc::new(StaticResolver::new(table(&["a"]))))
		.event_sink(Arc::new(sink))
		.build()
		.unwrap();

	cache.hosts_for("billing").await.unwrap();
	cache.hosts_for("billing").await.unwrap();

	assert_eq!(
		*events.lock(),
		vec![
			DiscoveryEvent::ResolveMiss {
				service: "billing".into()
			},
			DiscoveryEvent::RefreshStarted {
				url: "apps/".into()
			},
			DiscoveryEvent::RefreshCompleted { services: 1 },
		]
	);
}
