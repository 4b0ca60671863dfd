use std::any::Any;
use std::fmt;
use std::sync::Arc;

use cryptoreg_property::PropertySet;

use crate::kind::AlgorithmKind;

/// Provider-supplied operation table, opaque to the registry.
///
/// Callers recover the concrete type with [`Implementation::operations`].
pub type Operations = Arc<dyn Any + Send + Sync>;

/// One catalogue entry: an algorithm implementation and the properties it declares.
///
/// Immutable once its provider is built.
pub struct Implementation {
	pub(crate) kind: AlgorithmKind,
	/// Canonical name first, then aliases.
	pub(crate) names: Box<[Box<str>]>,
	pub(crate) properties: PropertySet,
	pub(crate) description: Option<Box<str>>,
	pub(crate) operations: Operations,
}

impl Implementation {
	pub fn kind(&self) -> AlgorithmKind {
		self.kind
	}

	/// The first name in the declared name list.
	pub fn canonical_name(&self) -> &str {
		&self.names[0]
	}

	/// Canonical name followed by aliases, as declared.
	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.names.iter().map(|n| &**n)
	}

	/// True if `name` is the canonical name or an alias, ignoring ASCII case.
	pub fn is_a(&self, name: &str) -> bool {
		self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
	}

	pub fn properties(&self) -> &PropertySet {
		&self.properties
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	/// Downcasts the operation table to the type the provider published.
	pub fn operations<T: Any>(&self) -> Option<&T> {
		self.operations.downcast_ref::<T>()
	}

	/// The type-erased operation table.
	pub fn raw_operations(&self) -> &Operations {
		&self.operations
	}
}

impl fmt::Debug for Implementation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Implementation")
			.field("kind", &self.kind)
			.field("names", &self.names)
			.field("properties", &format_args!("{}", self.properties))
			.finish_non_exhaustive()
	}
}
