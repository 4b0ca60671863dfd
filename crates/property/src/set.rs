use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::parse::{Mode, parse_clauses, parse_key};
use crate::query::Test;
use crate::value::PropertyValue;

/// The properties an implementation declares, e.g. `"provider=default,fips=yes"`.
///
/// Kept sorted by key, so iteration and `Display` are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertySet {
	entries: Vec<(Box<str>, PropertyValue)>,
}

impl PropertySet {
	/// An empty definition.
	pub const fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Parses a definition string. Only `key` and `key=value` clauses are accepted.
	pub fn parse(input: &str) -> Result<Self, ParseError> {
		let mut set = Self::new();
		for item in parse_clauses(input, Mode::Definition)? {
			let Test::Eq(value) = item.clause.test else {
				return Err(ParseError::NotAllowedInDefinition {
					what: "a non-equality test",
					offset: item.offset,
				});
			};
			if set.contains_key(&item.clause.key) {
				return Err(ParseError::DuplicateKey {
					key: item.clause.key.into_string(),
					offset: item.offset,
				});
			}
			set.put(item.clause.key, value);
		}
		Ok(set)
	}

	/// Adds or replaces a property, returning the previous value.
	///
	/// The key must follow the definition grammar and is lowercased to match
	/// parsed definitions. Rejected input leaves the set unchanged, so the
	/// canonical form always parses back.
	pub fn insert(
		&mut self,
		key: &str,
		value: impl Into<PropertyValue>,
	) -> Result<Option<PropertyValue>, ParseError> {
		let key = parse_key(key)?;
		let value = value.into();
		value.check_quotable(&key)?;
		Ok(self.put(key, value))
	}

	/// Inserts an already validated entry.
	fn put(&mut self, key: Box<str>, value: PropertyValue) -> Option<PropertyValue> {
		match self.entries.binary_search_by(|(k, _)| (**k).cmp(&*key)) {
			Ok(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
			Err(idx) => {
				self.entries.insert(idx, (key, value));
				None
			}
		}
	}

	/// Looks up a property. `key` must be lowercase.
	pub fn get(&self, key: &str) -> Option<&PropertyValue> {
		self.entries
			.binary_search_by(|(k, _)| (**k).cmp(key))
			.ok()
			.map(|idx| &self.entries[idx].1)
	}

	/// True if `key` is defined.
	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	/// Iterates `(key, value)` pairs in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> + '_ {
		self.entries.iter().map(|(k, v)| (&**k, v))
	}
}

impl FromStr for PropertySet {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for PropertySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (key, value)) in self.entries.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{key}={value}")?;
		}
		Ok(())
	}
}
