//! The fetch engine: resolve `(kind, name, query)` to an [`Algorithm`].
//!
//! # Resolution
//!
//! 1. Merge the context's default query with the call-site query; a key given
//!    at the call site replaces the default clause for that key.
//! 2. Consult the current snapshot's cache for `(kind, name, effective query)`.
//! 3. Otherwise scan the snapshot's candidates for `(kind, name)`, drop those
//!    failing a mandatory clause, and rank the rest by optional clauses
//!    satisfied. Ties go to the earlier registration, so the choice is stable
//!    for a given registration order. Callers must not depend on which of
//!    several matching providers wins.
//! 4. Lease the winning provider and wrap the descriptor in a fresh
//!    [`Algorithm`]. A provider retired since the snapshot was taken cannot
//!    be leased; the next candidate is tried instead.
//!
//! A failed fetch changes nothing but the log.

use cryptoreg_property::PropertyQuery;

use crate::algorithm::Algorithm;
use crate::context::{LibContext, resolve};
use crate::error::FetchError;
use crate::kind::AlgorithmKind;
use crate::provider::Lease;
use crate::registry::{CacheKey, Candidate, fold_name};

/// Fetches an implementation of `name` matching `query`.
///
/// `ctx == None` uses [`crate::default_context`]; `query == None` or `""` adds no
/// constraints beyond the context defaults.
pub fn fetch(
	ctx: Option<&LibContext>,
	kind: AlgorithmKind,
	name: &str,
	query: Option<&str>,
) -> Result<Algorithm, FetchError> {
	let ctx = resolve(ctx);
	let explicit = PropertyQuery::parse_opt(query)?;
	fetch_query(ctx, kind, name, &explicit)
}

/// [`fetch`] with an already parsed call-site query.
pub fn fetch_query(
	ctx: &LibContext,
	kind: AlgorithmKind,
	name: &str,
	explicit: &PropertyQuery,
) -> Result<Algorithm, FetchError> {
	let defaults = ctx.default_properties();
	let effective = PropertyQuery::merge(&defaults, explicit);
	let snap = ctx.registry().snapshot();
	let key: CacheKey = (kind, fold_name(name).into(), effective);

	if let Some(hit) = snap.cached(&key)
		&& let Some(lease) = Lease::acquire(&hit.provider)
	{
		tracing::trace!(%kind, name, provider = %hit.provider.name(), "fetch cache hit");
		return Ok(Algorithm::new(kind, name, hit.implementation, lease));
	}

	for candidate in rank(snap.candidates(kind, name), &key.2) {
		let Some(lease) = Lease::acquire(&candidate.provider) else {
			continue;
		};
		tracing::trace!(
			%kind,
			name,
			query = %key.2,
			provider = %candidate.provider.name(),
			generation = snap.generation,
			"fetch resolved"
		);
		let implementation = candidate.implementation.clone();
		snap.remember(key, candidate, ctx.registry().cache_capacity());
		return Ok(Algorithm::new(kind, name, implementation, lease));
	}

	tracing::debug!(%kind, name, query = %key.2, "fetch found no match");
	Err(FetchError::NotFound {
		kind,
		name: name.to_string(),
		query: key.2.to_string(),
	})
}

/// One algorithm object per provided implementation of `kind`, ignoring
/// properties, in registration order.
pub fn fetch_all(ctx: &LibContext, kind: AlgorithmKind) -> Vec<Algorithm> {
	ctx.registry()
		.implementations(kind)
		.into_iter()
		.filter_map(|candidate| {
			let lease = Lease::acquire(&candidate.provider)?;
			let name = candidate.implementation.canonical_name().to_string();
			Some(Algorithm::new(kind, &name, candidate.implementation, lease))
		})
		.collect()
}

/// Matching candidates, best first. The sort is stable, so equal scores keep
/// registration order.
fn rank(candidates: impl Iterator<Item = Candidate>, query: &PropertyQuery) -> Vec<Candidate> {
	let mut scored: Vec<(usize, Candidate)> = candidates
		.filter_map(|c| Some((query.evaluate(c.implementation.properties())?, c)))
		.collect();
	scored.sort_by(|a, b| b.0.cmp(&a.0));
	scored.into_iter().map(|(_, c)| c).collect()
}
