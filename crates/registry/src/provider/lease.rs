//! Provider lifecycle: outstanding algorithm objects and deferred teardown.
//!
//! # Invariants
//!
//! - The lifecycle word is `RETIRED | outstanding`. Leases are only taken while
//!   `RETIRED` is clear, so once a provider is retired its count only falls.
//! - The transition into exactly `RETIRED` (retired, zero outstanding) happens
//!   once. Whichever thread performs it runs the teardown hook.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use super::Provider;

const RETIRED: usize = 1 << (usize::BITS - 1);
const COUNT_MASK: usize = !RETIRED;

/// What to do when unregistering a provider that still backs live algorithm objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnloadPolicy {
	/// Remove the provider from the registry now and run its teardown after the
	/// last outstanding algorithm object is released.
	#[default]
	Defer,
	/// Fail with [`crate::ProviderError::Busy`] and leave the provider installed.
	Refuse,
}

/// Outcome of retiring a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retire {
	/// Retired with nothing outstanding; teardown already ran.
	TornDown,
	/// Retired; teardown will run on the last release.
	Deferred { outstanding: usize },
	/// Refused under [`UnloadPolicy::Refuse`].
	Busy { outstanding: usize },
	/// Someone else retired it first.
	AlreadyRetired,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
	word: AtomicUsize,
}

impl Lifecycle {
	pub(crate) fn is_retired(&self) -> bool {
		self.word.load(Ordering::Acquire) & RETIRED != 0
	}

	pub(crate) fn outstanding(&self) -> usize {
		self.word.load(Ordering::Acquire) & COUNT_MASK
	}

	/// Increments the count unless retired.
	fn try_acquire(&self) -> bool {
		let mut cur = self.word.load(Ordering::Acquire);
		loop {
			if cur & RETIRED != 0 {
				return false;
			}
			if cur == COUNT_MASK {
				// Same response as `Arc` to refcount overflow.
				std::process::abort();
			}
			match self.word.compare_exchange_weak(
				cur,
				cur + 1,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return true,
				Err(actual) => cur = actual,
			}
		}
	}

	/// Decrements the count. Returns true if this release must run teardown.
	fn release(&self) -> bool {
		let prev = self.word.fetch_sub(1, Ordering::AcqRel);
		debug_assert!(
			prev & COUNT_MASK != 0,
			"provider lease released more times than acquired"
		);
		prev == RETIRED | 1
	}

	pub(crate) fn retire(&self, policy: UnloadPolicy) -> Retire {
		match policy {
			UnloadPolicy::Refuse => {
				match self
					.word
					.compare_exchange(0, RETIRED, Ordering::AcqRel, Ordering::Acquire)
				{
					Ok(_) => Retire::TornDown,
					Err(cur) if cur & RETIRED != 0 => Retire::AlreadyRetired,
					Err(cur) => Retire::Busy { outstanding: cur },
				}
			}
			UnloadPolicy::Defer => {
				let prev = self.word.fetch_or(RETIRED, Ordering::AcqRel);
				if prev & RETIRED != 0 {
					Retire::AlreadyRetired
				} else if prev == 0 {
					Retire::TornDown
				} else {
					Retire::Deferred { outstanding: prev }
				}
			}
		}
	}
}

/// Keeps a provider alive and counted while an algorithm object exists.
pub(crate) struct Lease {
	provider: Provider,
}

impl Lease {
	/// Takes a lease unless the provider has been retired.
	pub(crate) fn acquire(provider: &Provider) -> Option<Self> {
		provider.inner.lifecycle.try_acquire().then(|| Self {
			provider: provider.clone(),
		})
	}

	pub(crate) fn provider(&self) -> &Provider {
		&self.provider
	}
}

impl Drop for Lease {
	fn drop(&mut self) {
		if self.provider.inner.lifecycle.release() {
			self.provider.run_teardown();
		}
	}
}
