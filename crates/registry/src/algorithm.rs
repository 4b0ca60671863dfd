//! Fetched algorithm objects.
//!
//! An [`Algorithm`] is a shared handle. [`Algorithm::acquire`] (or `clone`)
//! adds a holder, [`Algorithm::release`] (or dropping it) removes one, and the
//! object is torn down exactly once when the last holder lets go: the provider
//! lease is returned, which may in turn complete a deferred provider unload.
//!
//! Releasing a handle consumes it, so releasing more often than acquiring, or
//! touching an object after its final release, cannot be expressed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use cryptoreg_property::PropertySet;

use crate::kind::AlgorithmKind;
use crate::provider::{Implementation, Lease, Provider};

/// A fetched implementation of a named algorithm, bound to one provider.
#[derive(Clone)]
pub struct Algorithm {
	inner: Arc<AlgorithmInner>,
}

struct AlgorithmInner {
	kind: AlgorithmKind,
	/// The name the caller asked for, which may be an alias.
	name: Box<str>,
	implementation: Arc<Implementation>,
	lease: Lease,
}

impl Algorithm {
	pub(crate) fn new(
		kind: AlgorithmKind,
		name: &str,
		implementation: Arc<Implementation>,
		lease: Lease,
	) -> Self {
		Self {
			inner: Arc::new(AlgorithmInner {
				kind,
				name: name.into(),
				implementation,
				lease,
			}),
		}
	}

	/// Adds a holder and returns the new handle.
	#[must_use = "dropping the acquired handle releases it immediately"]
	pub fn acquire(&self) -> Self {
		self.clone()
	}

	/// Gives up this holder's reference.
	pub fn release(self) {
		drop(self);
	}

	/// Current number of holders.
	pub fn ref_count(&self) -> usize {
		Arc::strong_count(&self.inner)
	}

	pub fn kind(&self) -> AlgorithmKind {
		self.inner.kind
	}

	/// The name this object was fetched under.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// The implementation's canonical name.
	pub fn canonical_name(&self) -> &str {
		self.inner.implementation.canonical_name()
	}

	/// Canonical name followed by aliases.
	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.inner.implementation.names()
	}

	/// True if `name` is the canonical name or any alias, ignoring ASCII case.
	pub fn is_a(&self, name: &str) -> bool {
		self.inner.implementation.is_a(name)
	}

	/// The provider this object was fetched from.
	pub fn provider(&self) -> &Provider {
		self.inner.lease.provider()
	}

	pub fn properties(&self) -> &PropertySet {
		self.inner.implementation.properties()
	}

	pub fn description(&self) -> Option<&str> {
		self.inner.implementation.description()
	}

	pub fn implementation(&self) -> &Arc<Implementation> {
		&self.inner.implementation
	}

	/// Downcasts the provider's operation table.
	pub fn operations<T: Any>(&self) -> Option<&T> {
		self.inner.implementation.operations::<T>()
	}

	/// True if both handles share one object.
	pub fn ptr_eq(&self, other: &Algorithm) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// True if both handles wrap the same catalogue entry.
	pub fn same_implementation(&self, other: &Algorithm) -> bool {
		Arc::ptr_eq(&self.inner.implementation, &other.inner.implementation)
	}
}

impl fmt::Debug for Algorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Algorithm")
			.field("kind", &self.kind())
			.field("name", &self.name())
			.field("provider", &self.provider().name())
			.field("properties", &format_args!("{}", self.properties()))
			.field("refs", &self.ref_count())
			.finish()
	}
}
