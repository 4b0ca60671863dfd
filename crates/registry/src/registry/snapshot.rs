//! Immutable registry state and the views handed to readers.
//!
//! # Invariants
//!
//! - A [`Snapshot`] is never mutated after publication, except for its fetch
//!   cache, whose entries are computed from that same snapshot.
//! - [`Candidates`] pins the snapshot's candidate list, so a lookup stays valid
//!   across concurrent registration changes.

use std::borrow::Cow;
use std::sync::Arc;

use cryptoreg_property::PropertyQuery;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kind::AlgorithmKind;
use crate::provider::{Implementation, Provider};

/// A catalogue entry together with the provider that published it.
#[derive(Clone, Debug)]
pub struct Candidate {
	pub provider: Provider,
	pub implementation: Arc<Implementation>,
}

/// Cache key: kind, lowercased name, effective query.
pub(crate) type CacheKey = (AlgorithmKind, Box<str>, PropertyQuery);

type NameIndex = FxHashMap<Box<str>, Arc<[Candidate]>>;

pub(crate) struct Snapshot {
	pub(crate) generation: u64,
	/// Registration order.
	pub(crate) providers: Arc<[Provider]>,
	index: FxHashMap<AlgorithmKind, NameIndex>,
	cache: Mutex<FxHashMap<CacheKey, Candidate>>,
}

impl Snapshot {
	pub(crate) fn empty(generation: u64) -> Self {
		Self::build(generation, Arc::from(Vec::new()))
	}

	/// Indexes every name and alias of every provider, preserving registration
	/// order and then catalogue order within each bucket.
	pub(crate) fn build(generation: u64, providers: Arc<[Provider]>) -> Self {
		let mut staging: FxHashMap<AlgorithmKind, FxHashMap<Box<str>, Vec<Candidate>>> =
			FxHashMap::default();

		for provider in providers.iter() {
			for imp in provider.implementations() {
				let by_name = staging.entry(imp.kind()).or_default();
				let mut seen: Vec<Box<str>> = Vec::new();
				for name in imp.names() {
					let key: Box<str> = name.to_ascii_lowercase().into();
					// An alias repeating the canonical name must not list the entry twice.
					if seen.contains(&key) {
						continue;
					}
					seen.push(key.clone());
					by_name.entry(key).or_default().push(Candidate {
						provider: provider.clone(),
						implementation: Arc::clone(imp),
					});
				}
			}
		}

		let index = staging
			.into_iter()
			.map(|(kind, by_name)| {
				let by_name = by_name
					.into_iter()
					.map(|(name, list)| (name, Arc::from(list)))
					.collect();
				(kind, by_name)
			})
			.collect();

		Self {
			generation,
			providers,
			index,
			cache: Mutex::new(FxHashMap::default()),
		}
	}

	pub(crate) fn candidates(&self, kind: AlgorithmKind, name: &str) -> Candidates {
		let name = fold_name(name);
		let list = self
			.index
			.get(&kind)
			.and_then(|by_name| by_name.get(&*name))
			.cloned()
			.unwrap_or_else(|| Arc::from(Vec::new()));
		Candidates { list, pos: 0 }
	}

	pub(crate) fn provider(&self, name: &str) -> Option<&Provider> {
		self.providers
			.iter()
			.find(|p| p.name().eq_ignore_ascii_case(name))
	}

	pub(crate) fn cached(&self, key: &CacheKey) -> Option<Candidate> {
		self.cache.lock().get(key).cloned()
	}

	/// Remembers a resolution. At `capacity` entries the whole cache is flushed
	/// first; `capacity == 0` disables caching.
	pub(crate) fn remember(&self, key: CacheKey, candidate: Candidate, capacity: usize) {
		if capacity == 0 {
			return;
		}
		let mut cache = self.cache.lock();
		if cache.len() >= capacity && !cache.contains_key(&key) {
			tracing::warn!(
				generation = self.generation,
				capacity,
				"fetch cache full, flushing"
			);
			cache.clear();
		}
		cache.insert(key, candidate);
	}

	pub(crate) fn flush_cache(&self) -> usize {
		let mut cache = self.cache.lock();
		let n = cache.len();
		cache.clear();
		n
	}

	pub(crate) fn cache_len(&self) -> usize {
		self.cache.lock().len()
	}
}

/// Lowercases `name` only if it has uppercase letters.
pub(crate) fn fold_name(name: &str) -> Cow<'_, str> {
	if name.bytes().any(|b| b.is_ascii_uppercase()) {
		Cow::Owned(name.to_ascii_lowercase())
	} else {
		Cow::Borrowed(name)
	}
}

/// Restartable sequence of lookup results, in registration order.
///
/// Cloning yields an independent cursor over the same pinned list; callers must
/// not rely on the order for anything but reproducible tie-breaking.
#[derive(Clone, Debug)]
pub struct Candidates {
	list: Arc<[Candidate]>,
	pos: usize,
}

impl Candidates {
	/// Rewinds to the first candidate.
	pub fn restart(&mut self) {
		self.pos = 0;
	}

	/// Every candidate regardless of the cursor position.
	pub fn as_slice(&self) -> &[Candidate] {
		&self.list
	}
}

impl Iterator for Candidates {
	type Item = Candidate;

	fn next(&mut self) -> Option<Candidate> {
		let item = self.list.get(self.pos)?.clone();
		self.pos += 1;
		Some(item)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let rest = self.list.len().saturating_sub(self.pos);
		(rest, Some(rest))
	}
}

impl ExactSizeIterator for Candidates {}
