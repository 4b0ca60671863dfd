//! Provider registry with atomic snapshot publication.
//!
//! # Mental Model
//!
//! The registry is one [`ArcSwap`] holding an immutable `Snapshot`: the
//! ordered provider list, a name index built from their catalogues, and a fetch
//! cache scoped to that snapshot. Readers take a single atomic load. Writers
//! build a new snapshot next to the old one and publish it with a CAS retry
//! loop, so concurrent registrations are never lost and no reader sees a
//! half-published provider.
//!
//! # Invariants
//!
//! - Provider names are unique within a registry (ASCII case-insensitive).
//!   - Enforced in: [`ProviderRegistry::register`].
//! - A cached resolution never outlives the provider set it was computed from:
//!   every publication starts with an empty cache.
//!   - Enforced in: `Snapshot::build`.
//! - A provider is retired before it is removed, so under
//!   [`UnloadPolicy::Refuse`] a busy provider is never withdrawn.
//!   - Enforced in: [`ProviderRegistry::unregister`].

mod snapshot;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use snapshot::{Candidate, Candidates};
pub(crate) use snapshot::{CacheKey, Snapshot, fold_name};

use crate::error::ProviderError;
use crate::kind::AlgorithmKind;
use crate::provider::{Provider, Retire, UnloadPolicy};

/// Default bound on cached resolutions per snapshot.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// The set of providers installed in one library context.
pub struct ProviderRegistry {
	snap: ArcSwap<Snapshot>,
	cache_capacity: usize,
}

impl Default for ProviderRegistry {
	fn default() -> Self {
		Self::new(DEFAULT_CACHE_CAPACITY)
	}
}

impl ProviderRegistry {
	/// Creates an empty registry whose fetch cache holds up to `cache_capacity`
	/// entries (`0` disables caching).
	pub fn new(cache_capacity: usize) -> Self {
		Self {
			snap: ArcSwap::from_pointee(Snapshot::empty(0)),
			cache_capacity,
		}
	}

	/// Installs `provider` and publishes its catalogue.
	pub fn register(&self, provider: Provider) -> Result<(), ProviderError> {
		provider.claim()?;

		loop {
			let old = self.snap.load_full();
			if old.provider(provider.name()).is_some() {
				provider.unclaim();
				return Err(ProviderError::DuplicateProvider {
					name: provider.name().to_string(),
				});
			}

			let mut providers = old.providers.to_vec();
			providers.push(provider.clone());
			let next = Arc::new(Snapshot::build(old.generation + 1, Arc::from(providers)));
			let generation = next.generation;

			let prev = self.snap.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				tracing::debug!(
					provider = %provider.name(),
					algorithms = provider.implementations().len(),
					generation,
					"provider registered"
				);
				return Ok(());
			}
			// CAS failed, retry against the newer snapshot.
		}
	}

	/// Withdraws the provider called `name` and returns it.
	///
	/// Under [`UnloadPolicy::Defer`] the provider's teardown runs once its last
	/// algorithm object is released. Under [`UnloadPolicy::Refuse`] a provider
	/// with outstanding objects stays installed and `Busy` is returned.
	pub fn unregister(&self, name: &str, policy: UnloadPolicy) -> Result<Provider, ProviderError> {
		let unknown = || ProviderError::UnknownProvider {
			name: name.to_string(),
		};
		let provider = self.provider(name).ok_or_else(unknown)?;

		match provider.retire(policy) {
			Retire::TornDown => {}
			Retire::Deferred { outstanding } => {
				tracing::debug!(
					provider = %provider.name(),
					outstanding,
					"provider unregistered, teardown deferred"
				);
			}
			Retire::Busy { outstanding } => {
				tracing::warn!(
					provider = %provider.name(),
					outstanding,
					"refusing to unregister busy provider"
				);
				return Err(ProviderError::Busy {
					name: provider.name().to_string(),
					outstanding,
				});
			}
			// Lost a race with another unregister of the same provider.
			Retire::AlreadyRetired => return Err(unknown()),
		}

		self.withdraw(|p| p.ptr_eq(&provider));
		tracing::debug!(provider = %provider.name(), "provider unregistered");
		Ok(provider)
	}

	/// Withdraws every provider with deferred teardown. Returns how many were removed.
	pub fn clear(&self) -> usize {
		let removed = self.withdraw(|_| true);
		for provider in &removed {
			provider.retire(UnloadPolicy::Defer);
		}
		if !removed.is_empty() {
			tracing::debug!(count = removed.len(), "registry cleared");
		}
		removed.len()
	}

	/// Publishes a snapshot without the providers selected by `remove`.
	fn withdraw(&self, remove: impl Fn(&Provider) -> bool) -> Vec<Provider> {
		loop {
			let old = self.snap.load_full();
			let (removed, kept): (Vec<Provider>, Vec<Provider>) =
				old.providers.iter().cloned().partition(|p| remove(p));
			if removed.is_empty() {
				return removed;
			}

			let next = Arc::new(Snapshot::build(old.generation + 1, Arc::from(kept)));
			let prev = self.snap.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				return removed;
			}
		}
	}

	/// Catalogue entries of `kind` named `name` (or aliased so), in registration order.
	///
	/// Unknown names yield an empty sequence.
	pub fn lookup(&self, kind: AlgorithmKind, name: &str) -> Candidates {
		self.snap.load().candidates(kind, name)
	}

	/// Every implementation of `kind` across all providers, in registration order.
	pub fn implementations(&self, kind: AlgorithmKind) -> Vec<Candidate> {
		let snap = self.snap.load();
		snap.providers
			.iter()
			.flat_map(|provider| {
				provider
					.implementations()
					.iter()
					.filter(move |imp| imp.kind() == kind)
					.map(move |imp| Candidate {
						provider: provider.clone(),
						implementation: Arc::clone(imp),
					})
			})
			.collect()
	}

	/// Installed providers, in registration order.
	pub fn providers(&self) -> Vec<Provider> {
		self.snap.load().providers.to_vec()
	}

	/// Finds an installed provider by name, ignoring ASCII case.
	pub fn provider(&self, name: &str) -> Option<Provider> {
		self.snap.load().provider(name).cloned()
	}

	/// Number of installed providers.
	pub fn len(&self) -> usize {
		self.snap.load().providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Bumped on every registration change.
	pub fn generation(&self) -> u64 {
		self.snap.load().generation
	}

	/// Drops all cached resolutions of the current snapshot.
	pub fn flush_cache(&self) {
		let snap = self.snap.load();
		let flushed = snap.flush_cache();
		if flushed > 0 {
			tracing::debug!(generation = snap.generation, flushed, "fetch cache flushed");
		}
	}

	/// Number of cached resolutions in the current snapshot.
	pub fn cache_len(&self) -> usize {
		self.snap.load().cache_len()
	}

	pub(crate) fn cache_capacity(&self) -> usize {
		self.cache_capacity
	}

	pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
		self.snap.load_full()
	}
}
