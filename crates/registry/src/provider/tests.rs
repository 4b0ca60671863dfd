use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::rstest;

use super::*;

struct DigestOps {
	block_size: usize,
}

fn counting_provider(name: &str, hits: &Arc<AtomicUsize>) -> Provider {
	let hits = Arc::clone(hits);
	Provider::builder(name)
		.algorithm(
			AlgorithmKind::Digest,
			"SHA2-256:SHA-256:SHA256",
			"provider=default",
			DigestOps { block_size: 64 },
		)
		.on_teardown(move || {
			hits.fetch_add(1, Ordering::SeqCst);
		})
		.build()
		.unwrap()
}

/// Builder splits the name list and keeps the first entry canonical.
#[test]
fn test_builder_parses_aliases() {
	let provider = Provider::builder("default")
		.algorithm(
			AlgorithmKind::Digest,
			"SHA2-256 : SHA-256:SHA256",
			"provider=default,fips=yes",
			DigestOps { block_size: 64 },
		)
		.build()
		.unwrap();

	let imp = &provider.implementations()[0];
	assert_eq!(imp.canonical_name(), "SHA2-256");
	assert_eq!(imp.names().collect::<Vec<_>>(), ["SHA2-256", "SHA-256", "SHA256"]);
	assert!(imp.is_a("sha256"));
	assert!(!imp.is_a("SHA2-512"));
	assert_eq!(imp.operations::<DigestOps>().unwrap().block_size, 64);
	assert!(imp.operations::<u32>().is_none());
	assert_eq!(provider.lookup(AlgorithmKind::Digest, "sha-256").count(), 1);
	assert_eq!(provider.lookup(AlgorithmKind::Cipher, "sha-256").count(), 0);
}

/// Descriptions and shared operation tables are carried through unchanged.
#[test]
fn test_builder_description_and_shared_ops() {
	let ops: Operations = Arc::new(DigestOps { block_size: 128 });
	let provider = Provider::builder("p")
		.described_algorithm(AlgorithmKind::Digest, "SHA2-512", "", "SHA-2 512", DigestOps {
			block_size: 128,
		})
		.shared_algorithm(AlgorithmKind::Digest, "SHA2-512/256", "", Arc::clone(&ops))
		.build()
		.unwrap();

	let [first, second] = provider.implementations() else {
		panic!("expected two implementations");
	};
	assert_eq!(first.description(), Some("SHA-2 512"));
	assert_eq!(second.description(), None);
	assert!(Arc::ptr_eq(second.raw_operations(), &ops));
}

#[rstest]
#[case("")]
#[case("   ")]
fn test_builder_rejects_blank_provider_name(#[case] name: &str) {
	let err = Provider::builder(name).build().unwrap_err();
	assert!(matches!(err, ProviderError::EmptyName));
}

#[rstest]
#[case("")]
#[case("SHA2-256:")]
#[case("SHA2-256::SHA256")]
#[case(":SHA256")]
fn test_builder_rejects_empty_algorithm_names(#[case] names: &str) {
	let err = Provider::builder("p")
		.algorithm(AlgorithmKind::Digest, names, "", ())
		.build()
		.unwrap_err();
	assert!(matches!(err, ProviderError::EmptyAlgorithmName { .. }));
}

/// A malformed definition rejects the whole provider, naming the entry.
#[test]
fn test_builder_rejects_bad_properties() {
	let err = Provider::builder("p")
		.algorithm(AlgorithmKind::Digest, "SHA1", "provider=p", ())
		.algorithm(AlgorithmKind::Digest, "MD5", "fips=", ())
		.algorithm(AlgorithmKind::Digest, "SHA2-256", "?fips=yes", ())
		.build()
		.unwrap_err();
	match err {
		ProviderError::InvalidProperties {
			provider,
			algorithm,
			..
		} => {
			assert_eq!(provider, "p");
			assert_eq!(algorithm, "MD5");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

/// Dropping a provider that was never registered still runs its hook once.
#[test]
fn test_unregistered_provider_tears_down_on_drop() {
	let hits = Arc::new(AtomicUsize::new(0));
	let provider = counting_provider("p", &hits);
	let clone = provider.clone();
	drop(provider);
	assert_eq!(hits.load(Ordering::SeqCst), 0);
	drop(clone);
	assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Retiring an idle provider tears it down immediately and only once.
#[rstest]
#[case(UnloadPolicy::Defer)]
#[case(UnloadPolicy::Refuse)]
fn test_retire_idle_provider(#[case] policy: UnloadPolicy) {
	let hits = Arc::new(AtomicUsize::new(0));
	let provider = counting_provider("p", &hits);

	assert_eq!(provider.retire(policy), Retire::TornDown);
	assert!(!provider.is_loaded());
	assert_eq!(hits.load(Ordering::SeqCst), 1);

	assert_eq!(provider.retire(policy), Retire::AlreadyRetired);
	drop(provider);
	assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Deferred retirement waits for the last lease.
#[test]
fn test_deferred_teardown_runs_on_last_lease() {
	let hits = Arc::new(AtomicUsize::new(0));
	let provider = counting_provider("p", &hits);

	let a = Lease::acquire(&provider).unwrap();
	let b = Lease::acquire(&provider).unwrap();
	assert_eq!(provider.outstanding(), 2);

	assert_eq!(
		provider.retire(UnloadPolicy::Defer),
		Retire::Deferred { outstanding: 2 }
	);
	assert!(Lease::acquire(&provider).is_none(), "retired providers hand out no leases");

	drop(a);
	assert_eq!(hits.load(Ordering::SeqCst), 0);
	drop(b);
	assert_eq!(hits.load(Ordering::SeqCst), 1);
	assert_eq!(provider.outstanding(), 0);
}

/// Refusal leaves the provider loaded and leasable.
#[test]
fn test_refuse_keeps_busy_provider_loaded() {
	let hits = Arc::new(AtomicUsize::new(0));
	let provider = counting_provider("p", &hits);
	let lease = Lease::acquire(&provider).unwrap();

	assert_eq!(
		provider.retire(UnloadPolicy::Refuse),
		Retire::Busy { outstanding: 1 }
	);
	assert!(provider.is_loaded());
	assert!(Lease::acquire(&provider).is_some());

	drop(lease);
	assert_eq!(provider.retire(UnloadPolicy::Refuse), Retire::TornDown);
	assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// One handle can be claimed by one registry only, and never after retirement.
#[test]
fn test_claim_is_exclusive() {
	let provider = Provider::builder("p").build().unwrap();
	provider.claim().unwrap();
	assert!(matches!(
		provider.claim(),
		Err(ProviderError::AlreadyRegistered { .. })
	));
	provider.unclaim();
	provider.claim().unwrap();

	provider.retire(UnloadPolicy::Defer);
	provider.unclaim();
	assert!(matches!(provider.claim(), Err(ProviderError::Retired { .. })));
}

/// Leases race against deferred retirement; teardown still runs exactly once.
#[test]
fn test_concurrent_leases_and_retire() {
	let hits = Arc::new(AtomicUsize::new(0));
	let provider = counting_provider("p", &hits);

	std::thread::scope(|s| {
		for _ in 0..8 {
			s.spawn(|| {
				for _ in 0..500 {
					if let Some(lease) = Lease::acquire(&provider) {
						drop(lease);
					}
				}
			});
		}
		s.spawn(|| {
			std::thread::yield_now();
			provider.retire(UnloadPolicy::Defer);
		});
	});

	assert!(!provider.is_loaded());
	assert_eq!(provider.outstanding(), 0);
	assert_eq!(hits.load(Ordering::SeqCst), 1);
}
