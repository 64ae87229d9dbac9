//! Core types for gene matching.
//!
//! `MatchRequest` → (per identifier) `MatchResult` → `MatchRun`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::genes::GeneRecord;

// ═══════════════════════════════════════════
// Run identity
// ═══════════════════════════════════════════

/// Identity of one match run. Completions are applied only when their
/// run id is the one the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Exactly one candidate gene.
    Unique,
    /// Several candidates; one was picked by the tie-break.
    Partial,
    /// No candidate.
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Partial => "partial",
            Self::Unknown => "unknown",
        }
    }

    /// Label shown in filters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unique => "Unique",
            Self::Partial => "Partial",
            Self::Unknown => "Unknown",
        }
    }

    pub fn all() -> &'static [Classification] {
        &[Self::Unique, Self::Partial, Self::Unknown]
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Request / results
// ═══════════════════════════════════════════

/// Input of one match run.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub run_id: RunId,
    pub organism: String,
    pub identifiers: Vec<String>,
}

impl MatchRequest {
    pub fn new(organism: impl Into<String>, identifiers: Vec<String>) -> Self {
        Self {
            run_id: RunId::new(),
            organism: organism.into(),
            identifiers,
        }
    }
}

/// Outcome for one input identifier.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub input_name: String,
    /// Resolved gene; `None` means unknown.
    pub gene: Option<Arc<GeneRecord>>,
    pub classification: Classification,
    /// All candidate ids in tie-break order; the first is `gene`.
    pub candidates: Vec<u64>,
}

impl MatchResult {
    pub fn unknown(input_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            gene: None,
            classification: Classification::Unknown,
            candidates: Vec::new(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.gene.is_some()
    }

    pub fn ncbi_id(&self) -> Option<u64> {
        self.gene.as_ref().map(|g| g.ncbi_id)
    }
}

/// Counts shown to the user after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total: usize,
    pub known: usize,
    pub unique: usize,
    pub partial: usize,
    pub unknown: usize,
}

impl std::fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.total == 0 {
            return write!(f, "No genes on input");
        }
        writeln!(f, "{} genes in input data", self.total)?;
        writeln!(f, "{} genes match Entrez database", self.known)?;
        write!(f, "{} genes with match conflicts", self.partial)
    }
}

/// The results of one completed run, in input order.
#[derive(Debug, Clone)]
pub struct MatchRun {
    pub run_id: RunId,
    pub organism: String,
    pub results: Vec<MatchResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MatchRun {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn known(&self) -> usize {
        self.results.iter().filter(|r| r.is_known()).count()
    }

    pub fn unknown(&self) -> usize {
        self.total() - self.known()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn summary(&self) -> MatchSummary {
        let count = |c: Classification| self.results.iter().filter(|r| r.classification == c).count();
        MatchSummary {
            total: self.total(),
            known: self.known(),
            unique: count(Classification::Unique),
            partial: count(Classification::Partial),
            unknown: count(Classification::Unknown),
        }
    }

    pub fn known_results(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| r.is_known())
    }

    pub fn unknown_results(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| !r.is_known())
    }

    /// Input names without an Entrez match, for the "unmatched" listing.
    pub fn unknown_names(&self) -> Vec<&str> {
        self.unknown_results().map(|r| r.input_name.as_str()).collect()
    }

    pub fn known_names(&self) -> HashSet<&str> {
        self.known_results().map(|r| r.input_name.as_str()).collect()
    }

    /// First result for an input name.
    pub fn result_for(&self, input_name: &str) -> Option<&MatchResult> {
        self.results.iter().find(|r| r.input_name == input_name)
    }

    /// Results with the given classification, for filtered listings.
    pub fn with_classification(&self, classification: Classification) -> Vec<&MatchResult> {
        self.results
            .iter()
            .filter(|r| r.classification == classification)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn known(input: &str, ncbi_id: u64, classification: Classification) -> MatchResult {
        MatchResult {
            input_name: input.to_string(),
            gene: Some(Arc::new(GeneRecord::new(ncbi_id, "9606"))),
            classification,
            candidates: vec![ncbi_id],
        }
    }

    pub fn run_of(results: Vec<MatchResult>) -> MatchRun {
        let now = Utc::now();
        MatchRun {
            run_id: RunId::new(),
            organism: "9606".into(),
            results,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn counts_are_consistent() {
        let run = run_of(vec![
            known("BRCA1", 672, Classification::Unique),
            MatchResult::unknown("FAKE123"),
            known("AMB", 100, Classification::Partial),
        ]);
        let summary = run.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.known, 2);
        assert_eq!(summary.unique, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(run.known() + run.unknown(), run.total());
        assert_eq!(run.unknown_names(), vec!["FAKE123"]);
        assert!(run.known_names().contains("AMB"));
        assert_eq!(run.with_classification(Classification::Partial).len(), 1);
    }

    #[test]
    fn summary_text() {
        let run = run_of(vec![known("TP53", 7157, Classification::Unique), MatchResult::unknown("X")]);
        assert_eq!(
            run.summary().to_string(),
            "2 genes in input data\n1 genes match Entrez database\n0 genes with match conflicts"
        );
        assert_eq!(MatchSummary::default().to_string(), "No genes on input");
    }

    #[test]
    fn result_for_finds_first() {
        let run = run_of(vec![known("TP53", 7157, Classification::Unique)]);
        assert_eq!(run.result_for("TP53").and_then(|r| r.ncbi_id()), Some(7157));
        assert!(run.result_for("tp53").is_none());
    }

    #[test]
    fn run_ids_are_distinct() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn classification_serializes() {
        let json = serde_json::to_string(&Classification::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
        assert_eq!(Classification::Unknown.label(), "Unknown");
        assert_eq!(Classification::all().len(), 3);
    }
}
