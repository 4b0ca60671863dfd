//! Provider-based cryptographic algorithm registry.
//!
//! Applications ask for "a SHA-256 digest with `fips=yes`" without linking to
//! any particular implementation. Providers, installed into a [`LibContext`] at
//! runtime, publish catalogues of implementations annotated with properties;
//! the fetch engine picks one that satisfies the caller's property query merged
//! with the context defaults, and hands back a shared [`Algorithm`] handle whose
//! operation table the caller downcasts to the provider's concrete type.
//!
//! The registry never performs cryptography itself.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`LibContext`] | Scope of registration, default properties and caching. |
//! | [`ProviderRegistry`] | Atomically published provider set of one context. |
//! | [`Provider`] | Named, immutable catalogue of [`Implementation`]s. |
//! | [`Algorithm`] | Reference-counted result of a fetch. |
//! | [`PropertyQuery`] | Selection criteria, e.g. `"fips=yes,-legacy"`. |
//!
//! # Concurrency
//!
//! - Fetch and lookup: one atomic snapshot load plus a short cache lock.
//! - Registration changes: lock-free CAS publication of a new snapshot.
//! - Default properties: replaced by atomic swap, never mutated in place.
//! - Algorithm handles: `Send + Sync`, freely shared across threads.
//!
//! # Example
//!
//! ```
//! use cryptoreg::{AlgorithmKind, LibContext, Provider};
//!
//! struct Sha256Ops {
//! 	output_len: usize,
//! }
//!
//! let ctx = LibContext::new();
//! let provider = Provider::builder("default")
//! 	.algorithm(
//! 		AlgorithmKind::Digest,
//! 		"SHA2-256:SHA-256:SHA256",
//! 		"provider=default,default=yes",
//! 		Sha256Ops { output_len: 32 },
//! 	)
//! 	.build()
//! 	.unwrap();
//! ctx.register_provider(provider).unwrap();
//!
//! let md = ctx.fetch(AlgorithmKind::Digest, "sha256", Some("default=yes")).unwrap();
//! assert_eq!(md.canonical_name(), "SHA2-256");
//! assert_eq!(md.operations::<Sha256Ops>().unwrap().output_len, 32);
//! assert!(ctx.fetch(AlgorithmKind::Digest, "SHA256", Some("fips=yes")).is_err());
//! ```

mod algorithm;
mod config;
mod context;
mod error;
mod fetch;
mod kind;
mod provider;
mod registry;

pub use algorithm::Algorithm;
pub use config::{ConfigError, ContextConfig};
pub use context::{
	LibContext, default_context, register_provider, set_default_properties, unregister_provider,
};
pub use cryptoreg_property::{
	Clause, ParseError, PropertyQuery, PropertySet, PropertyValue, Test, matches,
};
pub use error::{FetchError, ProviderError};
pub use fetch::{fetch, fetch_all, fetch_query};
pub use kind::AlgorithmKind;
pub use provider::{Implementation, Operations, Provider, ProviderBuilder, UnloadPolicy};
pub use registry::{Candidate, Candidates, DEFAULT_CACHE_CAPACITY, ProviderRegistry};
