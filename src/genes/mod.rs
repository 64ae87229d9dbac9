//! Gene lookup service seam and canonical gene records.
//!
//! The matcher never talks to a gene database directly: it goes through
//! `GeneLookup`. Candidate searches return bare ids plus how they matched;
//! full record details are fetched on first use via `GeneRecord::load`.

pub mod gene_info;
pub mod sqlite;
#[cfg(test)]
pub mod testing;

pub use gene_info::{import_gene_info, parse_gene_info_line, GeneInfoRow, ImportReport};
pub use sqlite::SqliteGeneLookup;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Organism;

/// Detail page for an Entrez Gene record.
pub const NCBI_DETAIL_LINK: &str = "https://www.ncbi.nlm.nih.gov/gene/";

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Gene lookup service unavailable: {0}")]
    Unavailable(String),

    #[error("Gene lookup failed: {0}")]
    Query(String),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Gene not found: {ncbi_id}")]
    NotFound { ncbi_id: u64 },

    #[error("Invalid gene_info line {line}: {reason}")]
    Import { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// True when the service as a whole cannot be reached, as opposed to a
    /// single query failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ═══════════════════════════════════════════
// Candidates
// ═══════════════════════════════════════════

/// Which field of a gene record an identifier matched.
/// Ordered by precedence: a symbol hit beats a synonym hit beats a cross-reference hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Symbol,
    Synonym,
    CrossReference,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Synonym => "synonym",
            Self::CrossReference => "cross_reference",
        }
    }
}

/// One hit returned by a candidate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub ncbi_id: u64,
    pub source: MatchSource,
}

impl Candidate {
    pub fn new(ncbi_id: u64, source: MatchSource) -> Self {
        Self { ncbi_id, source }
    }
}

// ═══════════════════════════════════════════
// Gene records
// ═══════════════════════════════════════════

/// Full metadata of an Entrez Gene record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneDetails {
    pub symbol: Option<String>,
    pub synonyms: Vec<String>,
    /// External database name → identifiers in file order, e.g.
    /// `HGNC` → [`HGNC:11998`]. A database may list several ids.
    pub db_refs: BTreeMap<String, Vec<String>>,
    pub description: Option<String>,
    pub locus_tag: Option<String>,
    pub chromosome: Option<String>,
    pub map_location: Option<String>,
    pub type_of_gene: Option<String>,
}

impl GeneDetails {
    /// Synonyms joined for display.
    pub fn synonyms_text(&self) -> String {
        self.synonyms.join(", ")
    }

    pub fn db_refs_text(&self) -> String {
        self.db_refs
            .iter()
            .flat_map(|(db, ids)| ids.iter().map(move |id| format!("{db}: {id}")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every cross-reference id, across databases.
    pub fn db_ref_ids(&self) -> impl Iterator<Item = &str> {
        self.db_refs.values().flatten().map(String::as_str)
    }
}

/// A canonical gene, identified by its Entrez id.
///
/// Details are loaded at most once, on first use; the record itself never
/// changes after construction.
#[derive(Debug)]
pub struct GeneRecord {
    pub ncbi_id: u64,
    pub organism: String,
    details: OnceLock<GeneDetails>,
}

impl GeneRecord {
    pub fn new(ncbi_id: u64, organism: impl Into<String>) -> Self {
        Self {
            ncbi_id,
            organism: organism.into(),
            details: OnceLock::new(),
        }
    }

    /// A record whose details are already known.
    pub fn with_details(ncbi_id: u64, organism: impl Into<String>, details: GeneDetails) -> Self {
        let record = Self::new(ncbi_id, organism);
        let _ = record.details.set(details);
        record
    }

    /// Details, if they have been loaded.
    pub fn details(&self) -> Option<&GeneDetails> {
        self.details.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.details.get().is_some()
    }

    /// Fetch details from the lookup service unless already cached.
    pub fn load(&self, lookup: &dyn GeneLookup) -> Result<&GeneDetails, LookupError> {
        if let Some(details) = self.details.get() {
            return Ok(details);
        }
        let details = lookup.load_details(self.ncbi_id, &self.organism)?;
        Ok(self.details.get_or_init(|| details))
    }

    /// Symbol from loaded details; `None` when unloaded or blank.
    pub fn symbol(&self) -> Option<&str> {
        self.details()
            .and_then(|d| d.symbol.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn detail_link(&self) -> String {
        format!("{NCBI_DETAIL_LINK}{}", self.ncbi_id)
    }
}

// ═══════════════════════════════════════════
// Lookup service
// ═══════════════════════════════════════════

/// External gene lookup service.
///
/// Implementations match case-insensitively on symbol, synonyms and
/// cross-reference ids, restricted to one organism.
pub trait GeneLookup: Send + Sync {
    /// Check that the service can answer queries for `organism`.
    /// Returns `LookupError::Unavailable` when it cannot.
    fn ping(&self, organism: &str) -> Result<(), LookupError>;

    /// Every gene whose symbol, synonym or cross-reference equals `identifier`.
    /// A gene may appear more than once with different sources.
    fn find_candidates(&self, identifier: &str, organism: &str) -> Result<Vec<Candidate>, LookupError>;

    /// Full details of one gene.
    fn load_details(&self, ncbi_id: u64, organism: &str) -> Result<GeneDetails, LookupError>;

    /// Organisms the service has data for.
    fn list_organisms(&self) -> Result<Vec<Organism>, LookupError>;
}
