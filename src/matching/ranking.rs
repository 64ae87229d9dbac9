//! Candidate ranking and classification. Pure policy, no I/O.

use std::collections::BTreeMap;

use super::types::Classification;
use crate::genes::{Candidate, MatchSource};

/// Ranked candidates for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    /// One entry per distinct gene, best first.
    pub ranked: Vec<Candidate>,
    pub classification: Classification,
}

impl Ranking {
    /// The gene the identifier resolves to, if any.
    pub fn chosen(&self) -> Option<u64> {
        self.ranked.first().map(|c| c.ncbi_id)
    }

    pub fn ids(&self) -> Vec<u64> {
        self.ranked.iter().map(|c| c.ncbi_id).collect()
    }
}

/// Rank the raw hits of a candidate search.
///
/// Each gene is kept once, under the best source it matched by. Genes are
/// ordered by source (symbol, synonym, cross-reference) and then by
/// ascending Entrez id.
///
/// One distinct gene is `Unique`, none is `Unknown`. With several genes the
/// identifier is `Partial` and the first in the order above is chosen. That
/// choice is a heuristic: an identifier that is the official symbol of one
/// gene and a synonym of another goes to the symbol owner, and ties within a
/// source go to the oldest (lowest) id.
pub fn rank_candidates(candidates: &[Candidate]) -> Ranking {
    let mut best: BTreeMap<u64, MatchSource> = BTreeMap::new();
    for c in candidates {
        best.entry(c.ncbi_id)
            .and_modify(|s| *s = (*s).min(c.source))
            .or_insert(c.source);
    }

    let mut ranked: Vec<Candidate> = best
        .into_iter()
        .map(|(ncbi_id, source)| Candidate::new(ncbi_id, source))
        .collect();
    ranked.sort_by_key(|c| (c.source, c.ncbi_id));

    let classification = match ranked.len() {
        0 => Classification::Unknown,
        1 => Classification::Unique,
        _ => Classification::Partial,
    };

    Ranking {
        ranked,
        classification,
    }
}
