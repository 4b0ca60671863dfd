//! Hand-written scanner shared by definition and query parsing.
//!
//! Grammar (whitespace allowed around every token):
//!
//! ```text
//! list   := "" | clause ("," clause)*
//! clause := ["?"] ("-" key | key [("=" | "!=") value])
//! key    := ALPHA (ALNUM | "_" | ".")*
//! value  := '"' [^"]* '"' | "'" [^']* "'" | bare+
//! ```
//!
//! Definitions only accept `key` and `key=value`.

use crate::error::ParseError;
use crate::query::{Clause, Test};
use crate::value::{PropertyValue, is_bare_value_byte};

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
	Definition,
	Query,
}

/// A parsed clause plus the offset it started at, for duplicate reporting.
pub(crate) struct Located {
	pub offset: usize,
	pub clause: Clause,
}

pub(crate) fn parse_clauses(input: &str, mode: Mode) -> Result<Vec<Located>, ParseError> {
	let mut cur = Cursor { src: input, pos: 0 };
	let mut out = Vec::new();

	cur.skip_ws();
	if cur.at_end() {
		return Ok(out);
	}

	loop {
		out.push(cur.clause(mode)?);
		cur.skip_ws();
		match cur.peek() {
			None => break,
			Some(b',') => {
				cur.pos += 1;
				cur.skip_ws();
			}
			Some(_) => return Err(cur.unexpected()),
		}
	}

	Ok(out)
}

/// Validates and lowercases a standalone property name.
pub(crate) fn parse_key(input: &str) -> Result<Box<str>, ParseError> {
	let mut cur = Cursor { src: input, pos: 0 };
	let key = cur.key()?;
	if cur.at_end() {
		Ok(key)
	} else {
		Err(cur.unexpected())
	}
}

struct Cursor<'a> {
	src: &'a str,
	pos: usize,
}

impl Cursor<'_> {
	fn peek(&self) -> Option<u8> {
		self.src.as_bytes().get(self.pos).copied()
	}

	fn at_end(&self) -> bool {
		self.pos >= self.src.len()
	}

	fn skip_ws(&mut self) {
		while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
			self.pos += 1;
		}
	}

	fn unexpected(&self) -> ParseError {
		match self.src[self.pos..].chars().next() {
			Some(found) => ParseError::UnexpectedCharacter {
				found,
				offset: self.pos,
			},
			None => ParseError::EmptyKey { offset: self.pos },
		}
	}

	fn clause(&mut self, mode: Mode) -> Result<Located, ParseError> {
		let offset = self.pos;

		let optional = self.peek() == Some(b'?');
		if optional {
			if mode == Mode::Definition {
				return Err(ParseError::NotAllowedInDefinition {
					what: "'?'",
					offset,
				});
			}
			self.pos += 1;
			self.skip_ws();
		}

		if self.peek() == Some(b'-') {
			if mode == Mode::Definition {
				return Err(ParseError::NotAllowedInDefinition {
					what: "'-'",
					offset: self.pos,
				});
			}
			self.pos += 1;
			self.skip_ws();
			let key = self.key()?;
			return Ok(Located {
				offset,
				clause: Clause {
					key,
					test: Test::Absent,
					optional,
				},
			});
		}

		let key = self.key()?;
		self.skip_ws();

		let test = match self.peek() {
			Some(b'=') => {
				self.pos += 1;
				Test::Eq(self.value(&key)?)
			}
			Some(b'!') => {
				let bang = self.pos;
				self.pos += 1;
				if self.peek() != Some(b'=') {
					return Err(self.unexpected());
				}
				if mode == Mode::Definition {
					return Err(ParseError::NotAllowedInDefinition {
						what: "'!='",
						offset: bang,
					});
				}
				self.pos += 1;
				Test::Ne(self.value(&key)?)
			}
			_ => Test::Eq(PropertyValue::Bool(true)),
		};

		Ok(Located {
			offset,
			clause: Clause {
				key,
				test,
				optional,
			},
		})
	}

	fn key(&mut self) -> Result<Box<str>, ParseError> {
		let start = self.pos;
		while self
			.peek()
			.is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.'))
		{
			self.pos += 1;
		}

		let token = &self.src[start..self.pos];
		if token.is_empty() {
			return match self.peek() {
				None | Some(b',' | b'=' | b'!') => Err(ParseError::EmptyKey { offset: start }),
				Some(_) => Err(self.unexpected()),
			};
		}
		if !token.as_bytes()[0].is_ascii_alphabetic() || token.ends_with('.') {
			return Err(ParseError::InvalidKey {
				key: token.to_string(),
				offset: start,
			});
		}

		Ok(token.to_ascii_lowercase().into_boxed_str())
	}

	fn value(&mut self, key: &str) -> Result<PropertyValue, ParseError> {
		self.skip_ws();
		let start = self.pos;

		match self.peek() {
			None | Some(b',') => Err(ParseError::MissingValue {
				key: key.to_string(),
				offset: start,
			}),
			Some(q @ (b'"' | b'\'')) => {
				let body = start + 1;
				match self.src[body..].find(q as char) {
					Some(len) => {
						self.pos = body + len + 1;
						Ok(PropertyValue::String(self.src[body..body + len].into()))
					}
					None => Err(ParseError::UnterminatedQuote { offset: start }),
				}
			}
			Some(_) => {
				while self.peek().is_some_and(is_bare_value_byte) {
					self.pos += 1;
				}
				if self.pos == start {
					return Err(self.unexpected());
				}
				let token = self.src[start..self.pos].to_ascii_lowercase();
				Ok(PropertyValue::from_bare(&token))
			}
		}
	}
}
