use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::parse::{Mode, parse_clauses};
use crate::set::PropertySet;
use crate::value::PropertyValue;

/// What a clause requires of a definition's value for its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Test {
	/// `key=value` (or bare `key`, which means `key=yes`).
	Eq(PropertyValue),
	/// `key!=value`. The key must be defined with a different value.
	Ne(PropertyValue),
	/// `-key`. The key must not be defined at all.
	Absent,
}

/// One comma-separated element of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
	/// Lowercased property name.
	pub key: Box<str>,
	pub test: Test,
	/// Optional clauses (`?key=value`) rank candidates but never reject them.
	pub optional: bool,
}

impl Clause {
	/// Evaluates this clause alone against a definition.
	pub fn holds(&self, props: &PropertySet) -> bool {
		let defined = props.get(&self.key);
		match &self.test {
			Test::Eq(want) => defined == Some(want),
			Test::Ne(avoid) => defined.is_some_and(|have| have != avoid),
			Test::Absent => defined.is_none(),
		}
	}
}

impl fmt::Display for Clause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.optional {
			f.write_str("?")?;
		}
		match &self.test {
			Test::Eq(v) => write!(f, "{}={v}", self.key),
			Test::Ne(v) => write!(f, "{}!={v}", self.key),
			Test::Absent => write!(f, "-{}", self.key),
		}
	}
}

/// A parsed property query: an ordered conjunction of clauses.
///
/// The empty query matches every definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyQuery {
	clauses: Vec<Clause>,
}

impl PropertyQuery {
	/// The universal query.
	pub const fn any() -> Self {
		Self {
			clauses: Vec::new(),
		}
	}

	/// Parses a query string such as `"fips=yes, ?provider=default, -legacy"`.
	///
	/// Either the whole string parses or an error is returned; a key may appear
	/// at most once.
	pub fn parse(input: &str) -> Result<Self, ParseError> {
		let located = parse_clauses(input, Mode::Query)?;
		let mut clauses: Vec<Clause> = Vec::with_capacity(located.len());
		for item in located {
			if clauses.iter().any(|c| c.key == item.clause.key) {
				return Err(ParseError::DuplicateKey {
					key: item.clause.key.into_string(),
					offset: item.offset,
				});
			}
			clauses.push(item.clause);
		}
		Ok(Self { clauses })
	}

	/// Parses an optional query; `None` is the universal query.
	pub fn parse_opt(input: Option<&str>) -> Result<Self, ParseError> {
		input.map_or_else(|| Ok(Self::any()), Self::parse)
	}

	/// Combines context defaults with a call-site query.
	///
	/// The result is the conjunction of both. When a key appears in both, the
	/// explicit clause replaces the default one.
	pub fn merge(defaults: &PropertyQuery, explicit: &PropertyQuery) -> PropertyQuery {
		if defaults.is_empty() {
			return explicit.clone();
		}
		let mut clauses = explicit.clauses.clone();
		clauses.extend(
			defaults
				.clauses
				.iter()
				.filter(|d| explicit.get(&d.key).is_none())
				.cloned(),
		);
		PropertyQuery { clauses }
	}

	/// Returns `None` if a mandatory clause fails, otherwise the number of
	/// optional clauses that hold.
	pub fn evaluate(&self, props: &PropertySet) -> Option<usize> {
		let mut score = 0;
		for clause in &self.clauses {
			let holds = clause.holds(props);
			if clause.optional {
				score += usize::from(holds);
			} else if !holds {
				return None;
			}
		}
		Some(score)
	}

	/// The clauses in their original order.
	pub fn clauses(&self) -> &[Clause] {
		&self.clauses
	}

	/// Returns the clause for `key`, if any. `key` must be lowercase.
	pub fn get(&self, key: &str) -> Option<&Clause> {
		self.clauses.iter().find(|c| &*c.key == key)
	}

	/// True for the universal query.
	pub fn is_empty(&self) -> bool {
		self.clauses.is_empty()
	}
}

impl FromStr for PropertyQuery {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for PropertyQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, clause) in self.clauses.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{clause}")?;
		}
		Ok(())
	}
}

/// True when every mandatory clause of `query` holds for `props`.
///
/// Keys defined in `props` but not mentioned by `query` are ignored.
pub fn matches(props: &PropertySet, query: &PropertyQuery) -> bool {
	query.evaluate(props).is_some()
}
