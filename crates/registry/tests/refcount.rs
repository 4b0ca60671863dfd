//! Algorithm object sharing and provider teardown under concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use cryptoreg::{Algorithm, AlgorithmKind, LibContext, Provider, ProviderError, UnloadPolicy};

/// Operation table that counts its own destruction.
struct Tracked {
	drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
	fn drop(&mut self) {
		self.drops.fetch_add(1, Ordering::SeqCst);
	}
}

struct Fixture {
	ctx: LibContext,
	teardowns: Arc<AtomicUsize>,
	table_drops: Arc<AtomicUsize>,
}

fn fixture(policy: UnloadPolicy) -> Fixture {
	let teardowns = Arc::new(AtomicUsize::new(0));
	let table_drops = Arc::new(AtomicUsize::new(0));
	let hook = Arc::clone(&teardowns);
	let provider = Provider::builder("tracked")
		.algorithm(AlgorithmKind::Cipher, "AES-256-GCM:id-aes256-GCM", "", Tracked {
			drops: Arc::clone(&table_drops),
		})
		.on_teardown(move || {
			hook.fetch_add(1, Ordering::SeqCst);
		})
		.build()
		.unwrap();

	let config = cryptoreg::ContextConfig::default().with_unload_policy(policy);
	let ctx = LibContext::with_config(&config).unwrap();
	ctx.register_provider(provider).unwrap();
	Fixture {
		ctx,
		teardowns,
		table_drops,
	}
}

fn fetch_opt(ctx: &LibContext) -> Option<Algorithm> {
	ctx.fetch(AlgorithmKind::Cipher, "AES-256-GCM", None).ok()
}

fn fetch(ctx: &LibContext) -> Algorithm {
	fetch_opt(ctx).unwrap()
}

#[test]
fn test_acquire_release_counts() {
	let fx = fixture(UnloadPolicy::Defer);
	let alg = fetch(&fx.ctx);
	assert_eq!(alg.ref_count(), 1);

	let second = alg.acquire();
	assert!(second.ptr_eq(&alg));
	assert_eq!(alg.ref_count(), 2);

	second.release();
	assert_eq!(alg.ref_count(), 1);
	assert_eq!(alg.provider().outstanding(), 1);
}

/// Each fetch is its own object; acquires share one.
#[test]
fn test_fetches_do_not_share_objects() {
	let fx = fixture(UnloadPolicy::Defer);
	let a = fetch(&fx.ctx);
	let b = fetch(&fx.ctx);
	assert!(!a.ptr_eq(&b));
	assert!(a.same_implementation(&b));
	assert_eq!(a.provider().outstanding(), 2);

	let a2 = a.acquire();
	assert_eq!(a.provider().outstanding(), 2, "acquire does not take a new lease");
	drop((a, a2));
	assert_eq!(b.provider().outstanding(), 1);
}

/// N concurrent acquires then N concurrent releases tear down exactly once,
/// only after the final release.
#[test]
fn test_concurrent_acquire_release_tears_down_once() {
	const THREADS: usize = 16;
	const PER_THREAD: usize = 125;

	let fx = fixture(UnloadPolicy::Defer);
	let root = fetch(&fx.ctx);
	let provider = fx.ctx.unregister_provider("tracked").unwrap();
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 0);

	let barrier = Barrier::new(THREADS);
	let handles: Vec<Vec<Algorithm>> = std::thread::scope(|s| {
		let workers: Vec<_> = (0..THREADS)
			.map(|_| {
				let root = &root;
				let barrier = &barrier;
				s.spawn(move || {
					barrier.wait();
					(0..PER_THREAD).map(|_| root.acquire()).collect::<Vec<_>>()
				})
			})
			.collect();
		workers.into_iter().map(|w| w.join().unwrap()).collect()
	});
	assert_eq!(root.ref_count(), THREADS * PER_THREAD + 1);

	std::thread::scope(|s| {
		for batch in handles {
			let barrier = &barrier;
			let teardowns = &fx.teardowns;
			s.spawn(move || {
				barrier.wait();
				for alg in batch {
					alg.release();
					assert_eq!(teardowns.load(Ordering::SeqCst), 0);
				}
			});
		}
	});

	assert_eq!(root.ref_count(), 1);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 0);
	assert_eq!(fx.table_drops.load(Ordering::SeqCst), 0);

	root.release();
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
	assert_eq!(provider.outstanding(), 0);

	// The operation table lives as long as any provider handle.
	drop(provider);
	assert_eq!(fx.table_drops.load(Ordering::SeqCst), 1);
	drop(fx.ctx);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
}

/// Many independent objects released on many threads: still one teardown.
#[test]
fn test_concurrent_last_release_race() {
	const THREADS: usize = 32;

	for _ in 0..20 {
		let fx = fixture(UnloadPolicy::Defer);
		let objects: Vec<Algorithm> = (0..THREADS).map(|_| fetch(&fx.ctx)).collect();
		fx.ctx.unregister_provider("tracked").unwrap();

		let barrier = Barrier::new(THREADS);
		std::thread::scope(|s| {
			for alg in objects {
				let barrier = &barrier;
				s.spawn(move || {
					barrier.wait();
					alg.release();
				});
			}
		});
		assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
	}
}

/// Fetching while another thread unregisters never yields an object from a
/// torn-down provider.
#[test]
fn test_fetch_racing_unregister() {
	for _ in 0..20 {
		let fx = fixture(UnloadPolicy::Defer);
		let fetched = std::thread::scope(|s| {
			let fetchers: Vec<_> = (0..4)
				.map(|_| {
					let ctx = &fx.ctx;
					s.spawn(move || {
						(0..200)
							.filter_map(|_| fetch_opt(ctx))
							.collect::<Vec<_>>()
					})
				})
				.collect();
			fx.ctx.unregister_provider("tracked").unwrap();
			fetchers
				.into_iter()
				.flat_map(|f| f.join().unwrap())
				.collect::<Vec<_>>()
		});

		let expected = usize::from(fetched.is_empty());
		assert_eq!(fx.teardowns.load(Ordering::SeqCst), expected);
		drop(fetched);
		assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
	}
}

#[test]
fn test_refuse_policy_reports_busy() {
	let fx = fixture(UnloadPolicy::Refuse);
	let alg = fetch(&fx.ctx);
	let extra = alg.acquire();

	match fx.ctx.unregister_provider("tracked") {
		Err(ProviderError::Busy { name, outstanding }) => {
			assert_eq!(name, "tracked");
			assert_eq!(outstanding, 1);
		}
		other => panic!("expected Busy, got {other:?}"),
	}
	// Still installed and fetchable.
	assert_eq!(fx.ctx.providers().len(), 1);
	let another = fetch(&fx.ctx);

	drop((alg, extra, another));
	let provider = fx.ctx.unregister_provider("tracked").unwrap();
	assert!(!provider.is_loaded());
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
}

/// A context-level Refuse can be overridden per call.
#[test]
fn test_explicit_policy_override() {
	let fx = fixture(UnloadPolicy::Refuse);
	let alg = fetch(&fx.ctx);
	fx.ctx
		.unregister_provider_with("tracked", UnloadPolicy::Defer)
		.unwrap();
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 0);
	drop(alg);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
}

/// Dropping the context defers teardown to outstanding objects.
#[test]
fn test_context_drop_with_outstanding_objects() {
	let fx = fixture(UnloadPolicy::Refuse);
	let alg = fetch(&fx.ctx);
	drop(fx.ctx);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 0);
	assert_eq!(alg.canonical_name(), "AES-256-GCM");
	assert!(alg.is_a("id-aes256-gcm"));
	drop(alg);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_is_idempotent() {
	let fx = fixture(UnloadPolicy::Defer);
	assert_eq!(fx.ctx.shutdown(), 1);
	assert_eq!(fx.teardowns.load(Ordering::SeqCst), 1);
	assert_eq!(fx.ctx.shutdown(), 0);
	assert!(fx.ctx.fetch(AlgorithmKind::Cipher, "AES-256-GCM", None).is_err());
}
