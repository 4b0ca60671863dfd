use cryptoreg_property::ParseError;

use crate::kind::AlgorithmKind;

/// Failure to resolve a fetch request.
///
/// Both variants are recoverable and leave the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
	/// No loaded provider offers `name` with properties satisfying `query`.
	#[error("no {kind} implementation of {name:?} matches {query:?}")]
	NotFound {
		kind: AlgorithmKind,
		name: String,
		/// The effective query (context defaults merged with the call-site query).
		query: String,
	},

	/// The call-site query string is malformed.
	#[error("invalid property query: {0}")]
	InvalidQuery(#[from] ParseError),
}

/// Provider construction, registration and removal errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	#[error("provider name must not be empty")]
	EmptyName,

	/// An algorithm entry has an empty name or an empty alias in its name list.
	#[error("provider {provider:?} declares a {kind} with an empty name in {names:?}")]
	EmptyAlgorithmName {
		provider: String,
		kind: AlgorithmKind,
		names: String,
	},

	/// An algorithm entry's property definition does not parse.
	#[error("provider {provider:?}: bad properties for {kind} {algorithm:?}: {source}")]
	InvalidProperties {
		provider: String,
		kind: AlgorithmKind,
		algorithm: String,
		#[source]
		source: ParseError,
	},

	/// A provider with this name (compared case-insensitively) is already installed.
	#[error("a provider named {name:?} is already registered")]
	DuplicateProvider { name: String },

	/// This provider handle is already installed in some context.
	#[error("provider {name:?} is already registered in a context")]
	AlreadyRegistered { name: String },

	#[error("no provider named {name:?} is registered")]
	UnknownProvider { name: String },

	/// The provider was unregistered before and cannot be installed again.
	#[error("provider {name:?} has been unloaded")]
	Retired { name: String },

	/// Refused to unload while algorithm objects still reference the provider.
	#[error("provider {name:?} is busy: {outstanding} algorithm object(s) outstanding")]
	Busy { name: String, outstanding: usize },
}
