//! [`Query`] collection related to [`Location`]s.

use std::{
    collections::{hash_map, HashMap},
    convert::Infallible,
};

use common::operations::{By, Select};
use futures::future;
use itertools::Itertools as _;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Listing, Location};
use crate::{
    domain::location::{Hierarchy, Kind, Suggestion},
    infra::{database, Database},
    read::location::{Lookup, Match, Sample},
    Query, Service,
};

use super::DatabaseQuery;

/// Minimal number of characters in a query or its term.
pub const MIN_TERM_LEN: usize = 2;

/// Maximum number of [`Match`]es of a single [`Lookup`].
pub const LOOKUP_LIMIT: usize = 5;

/// [`Kind`]s of [`Lookup`]s issued for every term.
pub const LOOKUP_KINDS: [Kind; 4] =
    [Kind::City, Kind::Area, Kind::Zipcode, Kind::Address];

/// Delimiters splitting a query into terms.
const DELIMITERS: &[char] = &[',', '\u{FF0C}'];

/// Splits the provided `query` into deduplicated terms.
///
/// The whole trimmed `query` always goes first, followed by its parts split on
/// commas and whitespace. Terms shorter than [`MIN_TERM_LEN`] are discarded.
#[must_use]
pub fn terms(query: &str) -> Vec<String> {
    let query = query.trim();
    std::iter::once(query)
        .chain(
            query.split(|c: char| DELIMITERS.contains(&c) || c.is_whitespace()),
        )
        .map(str::trim)
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .unique()
        .map(ToOwned::to_owned)
        .collect()
}

/// Deduplicates and ranks the provided [`Suggestion`]s against the original
/// `query`.
///
/// Only the first [`Suggestion`] per [`Suggestion::key()`] is retained.
/// [`Suggestion`]s containing the `query` go first, then [`Kind`] priority
/// applies, and then the order of appearance.
#[must_use]
pub fn rank(
    query: &str,
    suggestions: impl IntoIterator<Item = Suggestion>,
    limit: usize,
) -> Vec<Suggestion> {
    let mut seen = HashMap::new();
    for (idx, s) in suggestions.into_iter().enumerate() {
        if let hash_map::Entry::Vacant(e) = seen.entry(s.key()) {
            _ = e.insert((idx, s));
        }
    }

    let query = query.trim().to_lowercase();
    seen.into_values()
        .sorted_by_key(|(idx, s)| (!s.contains(&query), s.kind(), *idx))
        .map(|(_, s)| s)
        .take(limit)
        .collect()
}

/// [`Query`] resolving a free-text query into ranked [`Suggestion`]s.
#[derive(Clone, Debug)]
pub struct Suggestions {
    /// Free-text query.
    pub query: String,

    /// Requested number of [`Suggestion`]s, if any.
    pub limit: Option<usize>,
}

impl<Db> Query<Suggestions> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Match>, Lookup>>,
        Ok = Vec<Match>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Suggestion>;
    type Err = Infallible;

    async fn execute(
        &self,
        Suggestions { query, limit }: Suggestions,
    ) -> Result<Self::Ok, Self::Err> {
        if query.trim().chars().count() < MIN_TERM_LEN {
            return Ok(vec![]);
        }
        let limit = limit
            .unwrap_or(self.config().suggestion_limit)
            .min(self.config().max_suggestion_limit)
            .max(1);
        let timeout = self.config().lookup_timeout;

        let lookups = terms(&query).into_iter().flat_map(|term| {
            LOOKUP_KINDS.into_iter().map(move |kind| Lookup {
                kind,
                term: term.clone(),
                limit: LOOKUP_LIMIT,
            })
        });
        let results =
            future::join_all(lookups.map(|lookup| async move {
                let (kind, term) = (lookup.kind, lookup.term.clone());
                let matches = match tokio::time::timeout(
                    timeout,
                    self.database().execute(Select(By::new(lookup))),
                )
                .await
                {
                    Ok(Ok(matches)) => matches,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            %kind, %term,
                            "location lookup failed: {e}"
                        );
                        vec![]
                    }
                    Err(_) => {
                        tracing::warn!(
                            %kind, %term,
                            "location lookup timed out after {timeout:?}"
                        );
                        vec![]
                    }
                };
                (kind, term, matches)
            }))
            .await;

        let suggestions =
            results.into_iter().flat_map(|(kind, term, matches)| {
                matches.into_iter().filter_map(move |m| {
                    Suggestion::from_match(
                        kind,
                        m.hierarchy,
                        Some(m.address),
                        term.clone(),
                    )
                })
            });

        Ok(rank(&query, suggestions, limit))
    }
}

/// City-level [`Location`] along with the number of its [`Listing`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PopularLocation {
    /// City-level [`Suggestion`].
    pub suggestion: Suggestion,

    /// Number of [`Listing`]s in the sample located in this city.
    pub count: usize,
}

/// Number of sampled [`Listing`]s per requested popular location.
pub const POPULAR_SAMPLE_FACTOR: usize = 3;

/// [`Query`] of the most frequent city-level [`Location`]s.
#[derive(Clone, Copy, Debug)]
pub struct Popular {
    /// Number of [`PopularLocation`]s to return.
    pub limit: usize,
}

impl<Db> Query<Popular> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Hierarchy>, Sample>>,
        Ok = Vec<Hierarchy>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<PopularLocation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Popular { limit }: Popular,
    ) -> Result<Self::Ok, Self::Err> {
        let sample = self
            .database()
            .execute(Select(By::new(Sample {
                kind: Kind::City,
                limit: limit.saturating_mul(POPULAR_SAMPLE_FACTOR),
            })))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(popular(sample, limit))
    }
}

/// Groups the provided [`Hierarchy`]s by city and prefecture, and returns the
/// `limit` most frequent ones.
///
/// Equally frequent locations keep the order of their first appearance.
#[must_use]
pub fn popular(
    sample: impl IntoIterator<Item = Hierarchy>,
    limit: usize,
) -> Vec<PopularLocation> {
    let mut groups = Vec::<PopularLocation>::new();
    let mut index = HashMap::<String, usize>::new();
    for hierarchy in sample {
        let Some(s) = Suggestion::from_match(Kind::City, hierarchy, None, "")
        else {
            continue;
        };
        match index.entry(s.key()) {
            hash_map::Entry::Occupied(e) => groups[*e.get()].count += 1,
            hash_map::Entry::Vacant(e) => {
                _ = e.insert(groups.len());
                groups.push(PopularLocation {
                    suggestion: s,
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps the first-seen order for ties.
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(limit);
    groups
}

/// Queries [`Hierarchy`]s of [`Listing`]s having a known value of a single
/// [`Kind`].
pub type ByField = DatabaseQuery<By<Vec<Hierarchy>, Sample>>;
