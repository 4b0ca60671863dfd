/// Malformed property definition or query string, or a property that could
/// not be written as one.
///
/// Every variant carries the byte offset into the input where parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
	/// A clause has no key (`=yes`, `a,,b`, trailing comma).
	#[error("empty property name at offset {offset}")]
	EmptyKey { offset: usize },

	/// A key does not start with a letter or contains a forbidden character.
	#[error("invalid property name {key:?} at offset {offset}")]
	InvalidKey { key: String, offset: usize },

	/// An operator is not followed by a value (`a=`, `a!=`).
	#[error("property {key:?} has an operator but no value (offset {offset})")]
	MissingValue { key: String, offset: usize },

	/// A quoted value is never closed.
	#[error("unterminated quoted value starting at offset {offset}")]
	UnterminatedQuote { offset: usize },

	/// Anything else that cannot appear where it was found.
	#[error("unexpected character {found:?} at offset {offset}")]
	UnexpectedCharacter { found: char, offset: usize },

	/// The same key appears twice in one string.
	#[error("property {key:?} is given more than once (offset {offset})")]
	DuplicateKey { key: String, offset: usize },

	/// Query-only syntax (`!=`, `?`, `-`) used in a definition.
	#[error("{what} is only valid in queries, not in definitions (offset {offset})")]
	NotAllowedInDefinition { what: &'static str, offset: usize },

	/// A string value contains both `'` and `"`. The offset is that of the
	/// first `"` in the value.
	#[error("value for {key:?} contains both quote characters (offset {offset})")]
	MixedQuotes { key: String, offset: usize },
}

impl ParseError {
	/// Byte offset into the parsed string.
	pub fn offset(&self) -> usize {
		match self {
			ParseError::EmptyKey { offset }
			| ParseError::InvalidKey { offset, .. }
			| ParseError::MissingValue { offset, .. }
			| ParseError::UnterminatedQuote { offset }
			| ParseError::UnexpectedCharacter { offset, .. }
			| ParseError::DuplicateKey { offset, .. }
			| ParseError::NotAllowedInDefinition { offset, .. }
			| ParseError::MixedQuotes { offset, .. } => *offset,
		}
	}
}
