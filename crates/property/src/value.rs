use std::fmt;

use crate::error::ParseError;

/// The value side of a property definition or query clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
	/// `yes` / `no`, matched case-insensitively when unquoted.
	Bool(bool),
	/// Unquoted decimal or `0x` hexadecimal digits.
	Number(u64),
	/// Any other value. Unquoted strings are lowercased, quoted ones are kept verbatim.
	String(Box<str>),
}

impl PropertyValue {
	/// Classifies an unquoted token. The token must already be lowercased.
	pub(crate) fn from_bare(token: &str) -> Self {
		match token {
			"yes" => return PropertyValue::Bool(true),
			"no" => return PropertyValue::Bool(false),
			_ => {}
		}
		let parsed = match token.strip_prefix("0x") {
			Some(hex) if !hex.is_empty() => u64::from_str_radix(hex, 16).ok(),
			Some(_) => None,
			None if token.bytes().all(|b| b.is_ascii_digit()) => token.parse().ok(),
			None => None,
		};
		match parsed {
			Some(n) => PropertyValue::Number(n),
			None => PropertyValue::String(token.into()),
		}
	}

	/// Fails for a string holding both quote characters, which no quoting
	/// style can write back out.
	pub(crate) fn check_quotable(&self, key: &str) -> Result<(), ParseError> {
		if let PropertyValue::String(s) = self
			&& s.contains('\'')
			&& let Some(offset) = s.find('"')
		{
			return Err(ParseError::MixedQuotes {
				key: key.to_string(),
				offset,
			});
		}
		Ok(())
	}

	/// True when the string form would not survive an unquoted round trip.
	fn needs_quotes(s: &str) -> bool {
		s.is_empty()
			|| PropertyValue::from_bare(s) != PropertyValue::String(s.into())
			|| s.bytes().any(|b| !is_bare_value_byte(b) || b.is_ascii_uppercase())
	}
}

impl From<bool> for PropertyValue {
	fn from(v: bool) -> Self {
		PropertyValue::Bool(v)
	}
}

impl From<u64> for PropertyValue {
	fn from(v: u64) -> Self {
		PropertyValue::Number(v)
	}
}

impl From<&str> for PropertyValue {
	fn from(v: &str) -> Self {
		PropertyValue::String(v.into())
	}
}

impl fmt::Display for PropertyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropertyValue::Bool(true) => f.write_str("yes"),
			PropertyValue::Bool(false) => f.write_str("no"),
			PropertyValue::Number(n) => write!(f, "{n}"),
			PropertyValue::String(s) if Self::needs_quotes(s) => {
				let quote = if s.contains('"') { '\'' } else { '"' };
				write!(f, "{quote}{s}{quote}")
			}
			PropertyValue::String(s) => f.write_str(s),
		}
	}
}

/// Bytes allowed in an unquoted value.
pub(crate) fn is_bare_value_byte(b: u8) -> bool {
	b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b'+' | b'/' | b':')
}
