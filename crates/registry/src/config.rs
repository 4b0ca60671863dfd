//! Library context configuration.
//!
//! ```toml
//! default_properties = "provider=default, -legacy"
//! unload_policy = "refuse"   # or "defer" (the default)
//! cache_capacity = 256       # 0 disables the fetch cache
//! ```

use std::path::{Path, PathBuf};

use cryptoreg_property::{ParseError, PropertyQuery};
use serde::Deserialize;

use crate::provider::UnloadPolicy;
use crate::registry::DEFAULT_CACHE_CAPACITY;

/// Settings applied when a [`crate::LibContext`] is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
	/// Property query merged into every fetch on the context.
	pub default_properties: String,
	pub unload_policy: UnloadPolicy,
	/// Cached resolutions kept per registry snapshot.
	pub cache_capacity: usize,
}

impl Default for ContextConfig {
	fn default() -> Self {
		Self {
			default_properties: String::new(),
			unload_policy: UnloadPolicy::default(),
			cache_capacity: DEFAULT_CACHE_CAPACITY,
		}
	}
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid configuration: {0}")]
	Toml(#[from] toml::de::Error),

	/// `default_properties` is not a valid property query.
	#[error("invalid default_properties: {0}")]
	InvalidProperties(#[from] ParseError),
}

impl ContextConfig {
	/// Parses TOML and validates `default_properties`.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.default_query()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// The parsed form of `default_properties`.
	pub fn default_query(&self) -> Result<PropertyQuery, ParseError> {
		PropertyQuery::parse(&self.default_properties)
	}

	pub fn with_default_properties(mut self, query: impl Into<String>) -> Self {
		self.default_properties = query.into();
		self
	}

	pub fn with_unload_policy(mut self, policy: UnloadPolicy) -> Self {
		self.unload_policy = policy;
		self
	}

	pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
		self.cache_capacity = capacity;
		self
	}
}
