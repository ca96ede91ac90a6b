//! Offline fuzzy search over the cached collection.
//!
//! Each record is matched on four fields (name, description, owner,
//! language). A field matches when the best approximate occurrence of the
//! term near the start of the field scores at or below the threshold; the
//! record score is the weighted product of its matching field scores.
//! Scores lie in `[0, 1]`, lower is better.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Repository;

/// Result ordering for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Best match first; collection order when there is no term.
    #[default]
    Relevance,
    /// Most stars first.
    Stars,
    /// Repository name, case-insensitive, lowercase before uppercase on ties.
    Name,
    /// Most recently updated first; unparseable timestamps last.
    Updated,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [Self::Relevance, Self::Stars, Self::Name, Self::Updated];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Stars => "stars",
            Self::Name => "name",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "stars" => Ok(Self::Stars),
            "name" => Ok(Self::Name),
            "updated" => Ok(Self::Updated),
            other => Err(format!(
                "unknown sort key '{other}' (expected relevance, stars, name or updated)"
            )),
        }
    }
}

/// Per-field weights; they are exponents of the field scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWeights {
    pub name: f64,
    pub description: f64,
    pub owner: f64,
    pub language: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            name: 0.4,
            description: 0.3,
            owner: 0.2,
            language: 0.1,
        }
    }
}

impl SearchWeights {
    fn as_array(&self) -> [f64; FIELD_COUNT] {
        [self.name, self.description, self.owner, self.language]
    }
}

/// Matching knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Highest field score that still counts as a match.
    pub threshold: f64,
    /// How many characters away from the start of a field a match may drift
    /// before its position alone costs a full point.
    pub distance: usize,
    /// Shortest (trimmed) term that is searched at all.
    pub min_match_len: usize,
    pub weights: SearchWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            distance: 100,
            min_match_len: 2,
            weights: SearchWeights::default(),
        }
    }
}

const FIELD_COUNT: usize = 4;

/// Immutable index over a collection of repositories.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    repos: Vec<Repository>,
    /// Lowercased name, description, owner and language per repository.
    fields: Vec<[Vec<char>; FIELD_COUNT]>,
    updated: Vec<Option<DateTime<Utc>>>,
    options: SearchOptions,
}

impl SearchIndex {
    pub fn build(repos: Vec<Repository>) -> Self {
        Self::with_options(repos, SearchOptions::default())
    }

    pub fn with_options(repos: Vec<Repository>, options: SearchOptions) -> Self {
        let fields = repos
            .iter()
            .map(|r| {
                [
                    lowercase_chars(&r.name),
                    lowercase_chars(r.description.as_deref().unwrap_or_default()),
                    lowercase_chars(&r.owner_login),
                    lowercase_chars(r.language.as_deref().unwrap_or_default()),
                ]
            })
            .collect();
        let updated = repos.iter().map(Repository::updated_at_parsed).collect();

        Self {
            repos,
            fields,
            updated,
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    /// Run a query.
    ///
    /// An empty or whitespace term returns the whole collection in `sort`
    /// order. A term shorter than `min_match_len` returns nothing.
    pub fn query(&self, term: &str, sort: SortKey) -> Vec<Repository> {
        self.query_scored(term, sort)
            .into_iter()
            .map(|(repo, _)| repo)
            .collect()
    }

    /// Like [`query`](Self::query) but keeps each record's score. Without a
    /// term every score is `0.0`.
    pub fn query_scored(&self, term: &str, sort: SortKey) -> Vec<(Repository, f64)> {
        let mut hits = self.rank(term);
        self.sort_hits(&mut hits, sort);
        hits.into_iter()
            .map(|(idx, score)| (self.repos[idx].clone(), score))
            .collect()
    }

    /// Matching records as `(index, score)`, best score first.
    fn rank(&self, term: &str) -> Vec<(usize, f64)> {
        let term = term.trim();
        if term.is_empty() {
            return (0..self.repos.len()).map(|idx| (idx, 0.0)).collect();
        }

        let pattern = lowercase_chars(term);
        if pattern.len() < self.options.min_match_len {
            return Vec::new();
        }

        let weights = self.options.weights.as_array();
        let mut hits: Vec<(usize, f64)> = self
            .fields
            .iter()
            .enumerate()
            .filter_map(|(idx, fields)| {
                let mut total = 1.0;
                let mut matched = false;
                for (text, weight) in fields.iter().zip(weights) {
                    if let Some(score) = self.field_score(&pattern, text) {
                        matched = true;
                        total *= score.max(f64::EPSILON).powf(weight);
                    }
                }
                matched.then_some((idx, total))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// Score of the best approximate occurrence of `pattern` in `text`, if it
    /// is within the threshold.
    fn field_score(&self, pattern: &[char], text: &[char]) -> Option<f64> {
        if text.is_empty() {
            return None;
        }

        let opts = &self.options;
        let distance = opts.distance.max(1) as f64;
        // A match starting past this point scores above the threshold on
        // position alone, and can extend at most 2m characters.
        let max_start = (opts.threshold * distance).floor() as usize;
        let window = text.len().min(max_start + 2 * pattern.len() + 1);

        best_match(pattern, &text[..window], distance)
            .map(|(errors, start)| match_score(errors, start, pattern.len(), distance))
            .filter(|score| *score <= opts.threshold)
    }

    /// Stable sort of `hits` (already in relevance order).
    fn sort_hits(&self, hits: &mut [(usize, f64)], sort: SortKey) {
        match sort {
            SortKey::Relevance => {}
            SortKey::Stars => {
                hits.sort_by(|a, b| self.repos[b.0].star_count.cmp(&self.repos[a.0].star_count))
            }
            SortKey::Name => {
                hits.sort_by(|a, b| locale_cmp(&self.repos[a.0].name, &self.repos[b.0].name))
            }
            SortKey::Updated => hits.sort_by(|a, b| {
                match (self.updated[a.0], self.updated[b.0]) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
        }
    }
}

fn lowercase_chars(s: &str) -> Vec<char> {
    s.to_lowercase().chars().collect()
}

fn match_score(errors: usize, start: usize, len: usize, distance: f64) -> f64 {
    (errors as f64 / len as f64 + start as f64 / distance).min(1.0)
}

/// Approximate substring search with the optimal string alignment distance
/// (substitution, insertion, deletion and adjacent transposition each cost 1).
///
/// Returns `(errors, start)` of the occurrence with the lowest
/// `errors/len + start/distance`, preferring fewer errors and then an earlier
/// start among alignments ending at the same position.
fn best_match(pattern: &[char], text: &[char], distance: f64) -> Option<(usize, usize)> {
    let m = pattern.len();
    let n = text.len();
    if m == 0 {
        return None;
    }

    let width = n + 1;
    // cost[i * width + j]: fewest errors aligning pattern[..i] to a text
    // substring ending at j; start holds where that substring begins.
    let mut cost = vec![0usize; (m + 1) * width];
    let mut start = vec![0usize; (m + 1) * width];

    for j in 0..=n {
        start[j] = j;
    }
    for i in 1..=m {
        cost[i * width] = i;
    }

    for i in 1..=m {
        for j in 1..=n {
            let here = i * width + j;
            let diag = (i - 1) * width + j - 1;
            let up = (i - 1) * width + j;
            let left = here - 1;

            let mut best = (
                cost[diag] + usize::from(pattern[i - 1] != text[j - 1]),
                start[diag],
            );
            for candidate in [(cost[up] + 1, start[up]), (cost[left] + 1, start[left])] {
                if candidate < best {
                    best = candidate;
                }
            }
            if i > 1 && j > 1 && pattern[i - 1] == text[j - 2] && pattern[i - 2] == text[j - 1] {
                let back = (i - 2) * width + j - 2;
                let candidate = (cost[back] + 1, start[back]);
                if candidate < best {
                    best = candidate;
                }
            }

            cost[here] = best.0;
            start[here] = best.1;
        }
    }

    let last = m * width;
    (0..=n)
        .map(|j| (cost[last + j], start[last + j]))
        .filter(|(errors, _)| *errors < m)
        .min_by(|a, b| {
            match_score(a.0, a.1, m, distance)
                .total_cmp(&match_score(b.0, b.1, m, distance))
                .then(a.cmp(b))
        })
}

/// Case-insensitive comparison; on a case-only difference the first
/// differing character decides, lowercase first.
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| {
        a.chars()
            .zip(b.chars())
            .find(|(x, y)| x != y)
            .map(|(x, y)| match (x.is_lowercase(), y.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => x.cmp(&y),
            })
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    })
}
