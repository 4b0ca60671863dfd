//! Library contexts: the scope of provider registration and default properties.
//!
//! Every fetch runs against one [`LibContext`]. Contexts are fully isolated:
//! each owns its registry, default query and fetch cache. When no context is
//! given, the process-wide [`default_context`] is used. It is created on first
//! use and lives until the process exits; [`LibContext::shutdown`] tears its
//! providers down explicitly.

use std::fmt;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use cryptoreg_property::{ParseError, PropertyQuery};

use crate::algorithm::Algorithm;
use crate::config::{ConfigError, ContextConfig};
use crate::error::{FetchError, ProviderError};
use crate::fetch;
use crate::kind::AlgorithmKind;
use crate::provider::{Provider, UnloadPolicy};
use crate::registry::ProviderRegistry;

/// A provider registry plus the default property query applied to its fetches.
pub struct LibContext {
	registry: ProviderRegistry,
	/// Swapped whole, never edited in place, so fetches never see a torn query.
	defaults: ArcSwap<PropertyQuery>,
	unload_policy: UnloadPolicy,
}

impl Default for LibContext {
	fn default() -> Self {
		Self::new()
	}
}

impl LibContext {
	/// An empty context with default settings.
	pub fn new() -> Self {
		let config = ContextConfig::default();
		Self::from_parts(&config, PropertyQuery::any())
	}

	/// A context configured by `config`. Fails if `default_properties` does not parse.
	pub fn with_config(config: &ContextConfig) -> Result<Self, ConfigError> {
		let defaults = config.default_query()?;
		Ok(Self::from_parts(config, defaults))
	}

	fn from_parts(config: &ContextConfig, defaults: PropertyQuery) -> Self {
		Self {
			registry: ProviderRegistry::new(config.cache_capacity),
			defaults: ArcSwap::from_pointee(defaults),
			unload_policy: config.unload_policy,
		}
	}

	pub fn registry(&self) -> &ProviderRegistry {
		&self.registry
	}

	/// Replaces the default query. On a parse error nothing changes.
	pub fn set_default_properties(&self, query: &str) -> Result<(), ParseError> {
		let parsed = PropertyQuery::parse(query)?;
		tracing::debug!(defaults = %parsed, "default properties set");
		self.defaults.store(Arc::new(parsed));
		self.registry.flush_cache();
		Ok(())
	}

	/// The current default query.
	pub fn default_properties(&self) -> Arc<PropertyQuery> {
		self.defaults.load_full()
	}

	pub fn unload_policy(&self) -> UnloadPolicy {
		self.unload_policy
	}

	pub fn register_provider(&self, provider: Provider) -> Result<(), ProviderError> {
		self.registry.register(provider)
	}

	/// Unregisters under this context's [`UnloadPolicy`].
	pub fn unregister_provider(&self, name: &str) -> Result<Provider, ProviderError> {
		self.registry.unregister(name, self.unload_policy)
	}

	/// Unregisters under an explicit policy.
	pub fn unregister_provider_with(
		&self,
		name: &str,
		policy: UnloadPolicy,
	) -> Result<Provider, ProviderError> {
		self.registry.unregister(name, policy)
	}

	/// Installed providers, in registration order.
	pub fn providers(&self) -> Vec<Provider> {
		self.registry.providers()
	}

	pub fn fetch(
		&self,
		kind: AlgorithmKind,
		name: &str,
		query: Option<&str>,
	) -> Result<Algorithm, FetchError> {
		fetch::fetch(Some(self), kind, name, query)
	}

	pub fn fetch_query(
		&self,
		kind: AlgorithmKind,
		name: &str,
		query: &PropertyQuery,
	) -> Result<Algorithm, FetchError> {
		fetch::fetch_query(self, kind, name, query)
	}

	pub fn fetch_all(&self, kind: AlgorithmKind) -> Vec<Algorithm> {
		fetch::fetch_all(self, kind)
	}

	/// Unregisters every provider with deferred teardown and returns how many
	/// were removed. Algorithm objects already handed out stay valid.
	pub fn shutdown(&self) -> usize {
		self.registry.clear()
	}
}

impl Drop for LibContext {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl fmt::Debug for LibContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LibContext")
			.field("providers", &self.registry.len())
			.field("defaults", &format_args!("{}", self.default_properties()))
			.field("unload_policy", &self.unload_policy)
			.finish()
	}
}

static DEFAULT_CONTEXT: OnceLock<LibContext> = OnceLock::new();

/// The process-wide context used when no explicit context is given.
///
/// It is created on first use and never dropped, not even at process exit.
/// Teardown hooks of providers registered on it run only when the provider
/// is unregistered or [`LibContext::shutdown`] is called, and under the
/// default policy not before the last object fetched from it is released.
/// The context stays usable after shutdown.
pub fn default_context() -> &'static LibContext {
	DEFAULT_CONTEXT.get_or_init(|| {
		tracing::debug!("initialising default library context");
		LibContext::new()
	})
}

pub(crate) fn resolve(ctx: Option<&LibContext>) -> &LibContext {
	match ctx {
		Some(ctx) => ctx,
		None => default_context(),
	}
}

/// [`LibContext::register_provider`] on `ctx` or the default context.
pub fn register_provider(
	ctx: Option<&LibContext>,
	provider: Provider,
) -> Result<(), ProviderError> {
	resolve(ctx).register_provider(provider)
}

/// [`LibContext::unregister_provider`] on `ctx` or the default context.
pub fn unregister_provider(
	ctx: Option<&LibContext>,
	name: &str,
) -> Result<Provider, ProviderError> {
	resolve(ctx).unregister_provider(name)
}

/// [`LibContext::set_default_properties`] on `ctx` or the default context.
pub fn set_default_properties(ctx: Option<&LibContext>, query: &str) -> Result<(), ParseError> {
	resolve(ctx).set_default_properties(query)
}
