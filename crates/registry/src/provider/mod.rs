//! Providers and their algorithm catalogues.
//!
//! A [`Provider`] is built once with [`ProviderBuilder`] and never mutated
//! afterwards: its catalogue is published wholesale when it is registered and
//! withdrawn wholesale when it is unregistered.

mod implementation;
mod lease;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cryptoreg_property::PropertySet;
use parking_lot::Mutex;

pub use implementation::{Implementation, Operations};
pub(crate) use lease::{Lease, Lifecycle, Retire};
pub use lease::UnloadPolicy;

use crate::error::ProviderError;
use crate::kind::AlgorithmKind;

type Teardown = Box<dyn FnOnce() + Send>;

/// Shared handle to an installed (or installable) provider.
///
/// Cloning is cheap; all clones refer to the same provider.
#[derive(Clone)]
pub struct Provider {
	pub(crate) inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
	name: Box<str>,
	catalogue: Box<[Arc<Implementation>]>,
	pub(crate) lifecycle: Lifecycle,
	registered: AtomicBool,
	teardown: Mutex<Option<Teardown>>,
}

impl Provider {
	/// Starts building a provider called `name`.
	pub fn builder(name: impl Into<Box<str>>) -> ProviderBuilder {
		ProviderBuilder::new(name)
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Every catalogue entry, in declaration order.
	pub fn implementations(&self) -> &[Arc<Implementation>] {
		&self.inner.catalogue
	}

	/// Catalogue entries of `kind` answering to `name` (or one of its aliases).
	pub fn lookup<'a>(
		&'a self,
		kind: AlgorithmKind,
		name: &'a str,
	) -> impl Iterator<Item = &'a Arc<Implementation>> + 'a {
		self.inner
			.catalogue
			.iter()
			.filter(move |imp| imp.kind == kind && imp.is_a(name))
	}

	/// False once the provider has been unregistered.
	pub fn is_loaded(&self) -> bool {
		!self.inner.lifecycle.is_retired()
	}

	/// Number of live algorithm objects fetched from this provider.
	pub fn outstanding(&self) -> usize {
		self.inner.lifecycle.outstanding()
	}

	/// True if both handles refer to the same provider.
	pub fn ptr_eq(&self, other: &Provider) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Claims the provider for one registry.
	pub(crate) fn claim(&self) -> Result<(), ProviderError> {
		if !self.is_loaded() {
			return Err(ProviderError::Retired {
				name: self.name().to_string(),
			});
		}
		self.inner
			.registered
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.map(|_| ())
			.map_err(|_| ProviderError::AlreadyRegistered {
				name: self.name().to_string(),
			})
	}

	/// Undoes [`Provider::claim`] when registration fails afterwards.
	pub(crate) fn unclaim(&self) {
		self.inner.registered.store(false, Ordering::Release);
	}

	pub(crate) fn retire(&self, policy: UnloadPolicy) -> Retire {
		let outcome = self.inner.lifecycle.retire(policy);
		if outcome == Retire::TornDown {
			self.run_teardown();
		}
		outcome
	}

	pub(crate) fn run_teardown(&self) {
		let hook = self.inner.teardown.lock().take();
		tracing::debug!(provider = %self.name(), "provider torn down");
		if let Some(hook) = hook {
			hook();
		}
	}
}

impl Drop for ProviderInner {
	fn drop(&mut self) {
		// Never-registered providers still get their hook.
		if let Some(hook) = self.teardown.get_mut().take() {
			hook();
		}
	}
}

impl fmt::Debug for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provider")
			.field("name", &self.name())
			.field("algorithms", &self.inner.catalogue.len())
			.field("loaded", &self.is_loaded())
			.field("outstanding", &self.outstanding())
			.finish()
	}
}

/// Assembles a provider's catalogue.
///
/// Errors in individual entries are held until [`ProviderBuilder::build`], so
/// a provider is either complete or rejected as a whole.
pub struct ProviderBuilder {
	name: Box<str>,
	catalogue: Vec<Arc<Implementation>>,
	teardown: Option<Teardown>,
	error: Option<ProviderError>,
}

impl ProviderBuilder {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			catalogue: Vec::new(),
			teardown: None,
			error: None,
		}
	}

	/// Adds an implementation.
	///
	/// `names` is a colon-separated list whose first element is the canonical
	/// name (`"SHA2-256:SHA-256:SHA256"`). `properties` is a definition string
	/// such as `"provider=default,fips=yes"`.
	pub fn algorithm<T>(
		self,
		kind: AlgorithmKind,
		names: &str,
		properties: &str,
		operations: T,
	) -> Self
	where
		T: Any + Send + Sync,
	{
		self.push(kind, names, properties, None, Arc::new(operations))
	}

	/// Like [`ProviderBuilder::algorithm`], with a human-readable description.
	pub fn described_algorithm<T>(
		self,
		kind: AlgorithmKind,
		names: &str,
		properties: &str,
		description: &str,
		operations: T,
	) -> Self
	where
		T: Any + Send + Sync,
	{
		self.push(kind, names, properties, Some(description.into()), Arc::new(operations))
	}

	/// Adds an implementation whose operation table is already shared.
	pub fn shared_algorithm(
		self,
		kind: AlgorithmKind,
		names: &str,
		properties: &str,
		operations: Operations,
	) -> Self {
		self.push(kind, names, properties, None, operations)
	}

	/// Runs `hook` exactly once, when the provider is finally released: after it
	/// has been unregistered and its last algorithm object dropped, or when the
	/// last handle goes away if it was never registered.
	pub fn on_teardown(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
		self.teardown = Some(Box::new(hook));
		self
	}

	pub fn build(self) -> Result<Provider, ProviderError> {
		if let Some(err) = self.error {
			return Err(err);
		}
		if self.name.trim().is_empty() {
			return Err(ProviderError::EmptyName);
		}
		Ok(Provider {
			inner: Arc::new(ProviderInner {
				name: self.name,
				catalogue: self.catalogue.into_boxed_slice(),
				lifecycle: Lifecycle::default(),
				registered: AtomicBool::new(false),
				teardown: Mutex::new(self.teardown),
			}),
		})
	}

	fn push(
		mut self,
		kind: AlgorithmKind,
		names: &str,
		properties: &str,
		description: Option<Box<str>>,
		operations: Operations,
	) -> Self {
		if self.error.is_some() {
			return self;
		}
		match self.describe(kind, names, properties) {
			Ok((names, properties)) => self.catalogue.push(Arc::new(Implementation {
				kind,
				names,
				properties,
				description,
				operations,
			})),
			Err(err) => self.error = Some(err),
		}
		self
	}

	fn describe(
		&self,
		kind: AlgorithmKind,
		names: &str,
		properties: &str,
	) -> Result<(Box<[Box<str>]>, PropertySet), ProviderError> {
		let parsed: Box<[Box<str>]> = names.split(':').map(|n| n.trim().into()).collect();
		if parsed.iter().any(|n| n.is_empty()) {
			return Err(ProviderError::EmptyAlgorithmName {
				provider: self.name.to_string(),
				kind,
				names: names.to_string(),
			});
		}
		let properties =
			PropertySet::parse(properties).map_err(|source| ProviderError::InvalidProperties {
				provider: self.name.to_string(),
				kind,
				algorithm: parsed[0].to_string(),
				source,
			})?;
		Ok((parsed, properties))
	}
}

#[cfg(test)]
mod tests;
